//! End-to-end fetches against a scripted TCP server.

use seqfeed_client::{ClientError, FetchBuilder};
use seqfeed_core::{Record, Side, Symbol};
use seqfeed_transport::TransportError;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn record(sequence: u32) -> Record {
    Record {
        symbol: Symbol::try_from(if sequence % 2 == 0 { "AAPL" } else { "MSFT" }).unwrap(),
        side: if sequence % 3 == 0 { Side::Sell } else { Side::Buy },
        quantity: 100 + sequence,
        price: 150_000 + sequence * 5,
        sequence,
    }
}

struct ScriptedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<[u8; 2]>>>,
    task: JoinHandle<()>,
}

impl ScriptedServer {
    /// Serves `bulk` for an ALL request and any sequence in `recoverable`
    /// for a ONE request. Bulk data is written in `chunk`-byte pieces.
    async fn start(bulk: Vec<Vec<u8>>, recoverable: Vec<u32>, chunk: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                serve(socket, &bulk, &recoverable, chunk, &log).await;
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    fn requests(&self) -> Vec<[u8; 2]> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    bulk: &[Vec<u8>],
    recoverable: &[u32],
    chunk: usize,
    log: &Mutex<Vec<[u8; 2]>>,
) {
    let mut request = [0u8; 2];
    while socket.read_exact(&mut request).await.is_ok() {
        log.lock().unwrap().push(request);
        match request[0] {
            1 => {
                let payload: Vec<u8> = bulk.concat();
                for piece in payload.chunks(chunk) {
                    socket.write_all(piece).await.unwrap();
                    socket.flush().await.unwrap();
                    tokio::task::yield_now().await;
                }
                let _ = socket.shutdown().await;
                return;
            }
            2 => {
                let sequence = u32::from(request[1]);
                if recoverable.contains(&sequence) {
                    socket.write_all(&record(sequence).encode()).await.unwrap();
                } else {
                    let _ = socket.shutdown().await;
                    return;
                }
            }
            _ => return,
        }
    }
}

fn frames(sequences: impl IntoIterator<Item = u32>) -> Vec<Vec<u8>> {
    sequences
        .into_iter()
        .map(|s| record(s).encode().to_vec())
        .collect()
}

fn builder(addr: SocketAddr, output: &std::path::Path) -> FetchBuilder {
    FetchBuilder::new(addr)
        .connect_timeout(Duration::from_secs(2))
        .idle_timeout(Duration::from_secs(2))
        .max_connect_attempts(1)
        .output(output)
}

fn read_json(path: &std::path::Path) -> Vec<serde_json::Value> {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_recovers_single_gap_and_persists() {
    let server = ScriptedServer::start(frames([1, 2, 4]), vec![3], 17).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("stockData.json");

    let report = builder(server.addr, &output).build().run().await.unwrap();

    assert_eq!(report.rounds, 1);
    assert_eq!(report.recovered, 1);
    assert_eq!(
        report.records.iter().map(|r| r.sequence).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(report.records[2], record(3));
    assert_eq!(server.requests(), vec![[1, 0], [2, 3]]);

    let persisted = read_json(&output);
    assert_eq!(persisted.len(), 4);
    assert!(persisted.iter().all(|v| !v.is_null()));
    assert_eq!(persisted[2]["packetSequence"], 3);
}

#[tokio::test]
async fn test_unaligned_chunks_and_multiple_gaps() {
    let bulk = (1..=20).filter(|s| ![5, 6, 13].contains(s));
    let server = ScriptedServer::start(frames(bulk), vec![5, 6, 13], 7).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    let report = builder(server.addr, &output).build().run().await.unwrap();

    assert_eq!(report.records.len(), 20);
    for (index, r) in report.records.iter().enumerate() {
        assert_eq!(r, &record(index as u32 + 1));
    }
    assert_eq!(
        server.requests(),
        vec![[1, 0], [2, 5], [2, 6], [2, 13]]
    );
    assert_eq!(read_json(&output).len(), 20);
}

#[tokio::test]
async fn test_gap_free_stream_skips_recovery() {
    let server = ScriptedServer::start(frames(1..=5), vec![], 40).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    let report = builder(server.addr, &output).build().run().await.unwrap();

    assert_eq!(report.rounds, 0);
    assert_eq!(report.records.len(), 5);
    assert_eq!(server.requests(), vec![[1, 0]]);
}

#[tokio::test]
async fn test_unrecoverable_gap_is_reported() {
    let server = ScriptedServer::start(frames([1, 2, 4]), vec![], 17).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    let err = builder(server.addr, &output)
        .max_recovery_rounds(2)
        .build()
        .run()
        .await
        .unwrap_err();

    match err {
        ClientError::RecoveryIncomplete {
            missing, rounds, ..
        } => {
            assert_eq!(missing, vec![3]);
            assert_eq!(rounds, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.requests(), vec![[1, 0], [2, 3], [2, 3]]);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_malformed_frame_aborts() {
    let mut bulk = frames([1, 2]);
    bulk[1][4] = b'Z';
    let server = ScriptedServer::start(bulk, vec![], 17).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    let err = builder(server.addr, &output)
        .build()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Format(
            seqfeed_core::Error::InvalidSide { value: b'Z' }
        ))
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_truncated_stream_aborts() {
    let mut bulk = frames([1, 2]);
    bulk[1].truncate(10);
    let server = ScriptedServer::start(bulk, vec![], 17).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    let err = builder(server.addr, &output)
        .build()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Transport(TransportError::TruncatedFrame { remaining: 10 })
    ));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dir = tempfile::tempdir().unwrap();

    let err = builder(addr, &dir.path().join("out.json"))
        .build()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::MaxConnectAttempts { attempts: 1, .. }
    ));
}
