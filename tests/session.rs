use std::{
    collections::VecDeque,
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use flower_client::{
    BoxError, Capability, Client, ClientConfig, ClientErr, FramedStream, Stream, Transport, codec,
    proto::{self, client_message, server_message},
    start_client,
    typing::{
        Config, EvaluateIns, EvaluateRes, FitIns, FitRes, Parameters, ParametersRes, Scalar,
    },
};
use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

const BUF_SIZE: usize = 4096;
const MAX_MESSAGE_LENGTH: usize = 1 << 20;

type Conn = FramedStream<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

fn stream_pair() -> (Conn, Conn) {
    let (one, two) = tokio::io::duplex(BUF_SIZE);
    let (rx1, tx1) = tokio::io::split(one);
    let (rx2, tx2) = tokio::io::split(two);

    (
        FramedStream::new(rx1, tx1, MAX_MESSAGE_LENGTH),
        FramedStream::new(rx2, tx2, MAX_MESSAGE_LENGTH),
    )
}

/// Hands out pre-built in-memory streams, one per connect.
struct MockTransport {
    conns: Mutex<VecDeque<Conn>>,
    connects: AtomicUsize,
}

impl MockTransport {
    /// Returns the transport and the server ends of `n` streams.
    fn new(n: usize) -> (Self, Vec<Conn>) {
        let (clients, servers) = (0..n).map(|_| stream_pair()).unzip();

        let transport = Self {
            conns: Mutex::new(clients),
            connects: AtomicUsize::new(0),
        };

        (transport, servers)
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    type Conn = Conn;

    async fn connect(&self, _addr: &str) -> io::Result<Self::Conn> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        self.conns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
    }
}

struct ExampleClient;

impl Client for ExampleClient {
    fn get_parameters(&mut self) -> Result<ParametersRes, BoxError> {
        let tensors = vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()];
        Ok(Parameters::new(tensors, "example tensor").into())
    }

    fn fit(&mut self, ins: FitIns) -> Result<FitRes, BoxError> {
        let tensor_type = ins.parameters.tensor_type;
        let tensors = ins
            .parameters
            .tensors
            .into_iter()
            .map(|t| [t, b"1".to_vec()].concat())
            .collect();

        let metrics = ins
            .config
            .into_iter()
            .map(|(key, value)| (format!("{key}1"), value))
            .collect();

        Ok(FitRes {
            parameters: Parameters::new(tensors, tensor_type),
            num_examples: 5,
            metrics,
            ..Default::default()
        })
    }

    fn evaluate(&mut self, _: EvaluateIns) -> Result<EvaluateRes, BoxError> {
        Ok(EvaluateRes {
            loss: 0.5,
            num_examples: 5,
            ..Default::default()
        })
    }
}

struct FailingClient;

impl Client for FailingClient {
    fn get_parameters(&mut self) -> Result<ParametersRes, BoxError> {
        Ok(ParametersRes::default())
    }

    fn fit(&mut self, _: FitIns) -> Result<FitRes, BoxError> {
        Err("diverged".into())
    }

    fn evaluate(&mut self, _: EvaluateIns) -> Result<EvaluateRes, BoxError> {
        Err("diverged".into())
    }
}

fn config() -> ClientConfig {
    ClientConfig::new("server-0:50051").with_max_message_length(MAX_MESSAGE_LENGTH)
}

/// Sends `msg` and waits for the client's answer.
async fn instruct(server: &mut Conn, msg: server_message::Msg) -> io::Result<client_message::Msg> {
    let buf = codec::encode_server_message(&msg.into())?;
    server.send(&buf).await?;

    let buf = server.receive().await?;
    let msg = codec::decode_client_message(&buf)?;
    Ok(msg.into_msg().expect("exactly one tag"))
}

fn reconnect(seconds: u64) -> server_message::Msg {
    server_message::Msg::ReconnectIns(proto::ReconnectIns {
        seconds: Some(seconds),
    })
}

async fn expect_eof(server: &mut Conn) {
    let err = server.receive().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn session_answers_until_acknowledged_disconnect() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(1);
    let mut server = servers.remove(0);
    let mut client = ExampleClient;

    let config = config();
    let client_fut = start_client(&transport, &config, &mut client, CancellationToken::new());

    let server_fut = async {
        let msg = server_message::Msg::GetParametersIns(Default::default());
        let client_message::Msg::GetParametersRes(res) = instruct(&mut server, msg).await? else {
            panic!("expected get_parameters_res");
        };
        assert_eq!(res.parameters.tensors.len(), 3);

        let ins = FitIns {
            parameters: Parameters::new(vec![b"a".to_vec(), b"b".to_vec()], "example tensor"),
            config: Config::from([("lr".to_owned(), Scalar::Float(0.1))]),
        };
        let msg = server_message::Msg::FitIns(ins.into());
        let client_message::Msg::FitRes(res) = instruct(&mut server, msg).await? else {
            panic!("expected fit_res");
        };
        let res = FitRes::try_from(res)?;
        assert_eq!(res.parameters.tensors, vec![b"a1".to_vec(), b"b1".to_vec()]);
        assert_eq!(
            res.metrics,
            Config::from([("lr1".to_owned(), Scalar::Float(0.1))])
        );

        let msg = server_message::Msg::EvaluateIns(Default::default());
        let client_message::Msg::EvaluateRes(res) = instruct(&mut server, msg).await? else {
            panic!("expected evaluate_res");
        };
        assert_eq!(res.loss, 0.5);

        let client_message::Msg::DisconnectRes(res) = instruct(&mut server, reconnect(0)).await?
        else {
            panic!("expected disconnect_res");
        };
        assert_eq!(res.reason, proto::Reason::Ack);

        expect_eof(&mut server).await;
        Ok::<_, io::Error>(())
    };

    let (ret, server_ret) = tokio::join!(client_fut, server_fut);
    ret?;
    server_ret?;

    assert_eq!(transport.connects(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reconnect_opens_a_new_stream_after_the_delay() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(2);
    let mut second = servers.pop().unwrap();
    let mut first = servers.pop().unwrap();
    let mut client = ExampleClient;

    let config = config();
    let client_fut = start_client(&transport, &config, &mut client, CancellationToken::new());

    let server_fut = async {
        let client_message::Msg::DisconnectRes(res) = instruct(&mut first, reconnect(7)).await?
        else {
            panic!("expected disconnect_res");
        };
        assert_eq!(res.reason, proto::Reason::Reconnect);
        expect_eof(&mut first).await;

        let closed_at = Instant::now();

        let msg = server_message::Msg::GetParametersIns(Default::default());
        let client_message::Msg::GetParametersRes(_) = instruct(&mut second, msg).await? else {
            panic!("expected get_parameters_res");
        };
        assert!(closed_at.elapsed() >= Duration::from_secs(7));

        instruct(&mut second, reconnect(0)).await?;
        expect_eof(&mut second).await;
        Ok::<_, io::Error>(())
    };

    let (ret, server_ret) = tokio::join!(client_fut, server_fut);
    ret?;
    server_ret?;

    assert_eq!(transport.connects(), 2);
    Ok(())
}

#[tokio::test]
async fn shutdown_interrupts_waiting_for_the_server() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(1);
    let mut server = servers.remove(0);
    let mut client = ExampleClient;

    let shutdown = CancellationToken::new();
    let config = config();
    let client_fut = start_client(&transport, &config, &mut client, shutdown.clone());

    let server_fut = async {
        tokio::task::yield_now().await;
        shutdown.cancel();
        expect_eof(&mut server).await;
    };

    let (ret, _) = tokio::join!(client_fut, server_fut);
    ret?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_reconnect_delay() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(2);
    let mut server = servers.remove(0);
    let mut client = ExampleClient;

    let shutdown = CancellationToken::new();
    let started = Instant::now();
    let config = config();
    let client_fut = start_client(&transport, &config, &mut client, shutdown.clone());

    let server_fut = async {
        instruct(&mut server, reconnect(3600)).await?;
        expect_eof(&mut server).await;
        shutdown.cancel();
        Ok::<_, io::Error>(())
    };

    let (ret, server_ret) = tokio::join!(client_fut, server_fut);
    ret?;
    server_ret?;

    assert!(started.elapsed() < Duration::from_secs(3600));
    assert_eq!(transport.connects(), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_envelope_aborts_without_a_response() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(2);
    let mut server = servers.remove(0);
    let mut client = ExampleClient;

    let config = config();
    let client_fut = start_client(&transport, &config, &mut client, CancellationToken::new());

    let server_fut = async {
        server.send(b"{}").await?;
        expect_eof(&mut server).await;
        Ok::<_, io::Error>(())
    };

    let (ret, server_ret) = tokio::join!(client_fut, server_fut);
    server_ret?;

    assert!(matches!(ret, Err(ClientErr::MalformedEnvelope(_))));
    assert_eq!(transport.connects(), 1);
    Ok(())
}

#[tokio::test]
async fn capability_failure_aborts_the_session() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(2);
    let mut server = servers.remove(0);
    let mut client = FailingClient;

    let config = config();
    let client_fut = start_client(&transport, &config, &mut client, CancellationToken::new());

    let server_fut = async {
        let msg = server_message::Msg::FitIns(Default::default());
        let buf = codec::encode_server_message(&msg.into())?;
        server.send(&buf).await?;

        expect_eof(&mut server).await;
        Ok::<_, io::Error>(())
    };

    let (ret, server_ret) = tokio::join!(client_fut, server_fut);
    server_ret?;

    assert!(matches!(
        ret,
        Err(ClientErr::Capability {
            capability: Capability::Fit,
            ..
        })
    ));
    assert_eq!(transport.connects(), 1);
    Ok(())
}

#[tokio::test]
async fn dropped_stream_is_not_reconnected() -> io::Result<()> {
    let (transport, mut servers) = MockTransport::new(2);
    let server = servers.remove(0);
    let mut client = ExampleClient;

    drop(server);
    let config = config();
    let ret = start_client(&transport, &config, &mut client, CancellationToken::new()).await;

    assert!(matches!(ret, Err(ClientErr::Io(_))));
    assert_eq!(transport.connects(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_connect_is_reported() {
    let (transport, _) = MockTransport::new(0);
    let mut client = ExampleClient;

    let config = config();
    let ret = start_client(&transport, &config, &mut client, CancellationToken::new()).await;

    assert!(matches!(ret, Err(ClientErr::Io(e)) if e.kind() == io::ErrorKind::ConnectionRefused));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_connecting() {
    let (transport, _servers) = MockTransport::new(1);
    let mut client = ExampleClient;

    let config = ClientConfig::new("");
    let ret = start_client(&transport, &config, &mut client, CancellationToken::new()).await;

    assert!(matches!(ret, Err(ClientErr::InvalidConfig(_))));
    assert_eq!(transport.connects(), 0);
}
