use std::io;

use flower_client::{
    BoxError, Client, ClientConfig, TcpTransport, start_client,
    typing::{EvaluateIns, EvaluateRes, FitIns, FitRes, Parameters, ParametersRes},
};
use log::info;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Keeps whatever parameters the server seeds it with.
#[derive(Default)]
struct InMemoryClient {
    parameters: Parameters,
}

impl Client for InMemoryClient {
    fn get_parameters(&mut self) -> Result<ParametersRes, BoxError> {
        Ok(self.parameters.clone().into())
    }

    fn fit(&mut self, ins: FitIns) -> Result<FitRes, BoxError> {
        if let Some(parameters) = ins.seed() {
            self.parameters = parameters.clone();
        }

        Ok(FitRes {
            parameters: self.parameters.clone(),
            num_examples: 1,
            ..Default::default()
        })
    }

    fn evaluate(&mut self, ins: EvaluateIns) -> Result<EvaluateRes, BoxError> {
        if let Some(parameters) = ins.seed() {
            self.parameters = parameters.clone();
        }

        Ok(EvaluateRes {
            num_examples: 1,
            ..Default::default()
        })
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = ClientConfig::from_env()?;
    let transport = TcpTransport::new(config.max_message_length());
    let mut client = InMemoryClient::default();

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("received SIGINT");
            ctrl_c.cancel();
        }
    });

    info!("connecting to {}", config.server_address());
    start_client(&transport, &config, &mut client, shutdown).await?;

    info!("wrapping up");
    Ok(())
}
