use std::sync::Arc;

use stagemux_http::connection::HttpConnection;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info, warn};

use crate::config::TransportMode;
use crate::error::ServeError;
use crate::router::Router;
use crate::stage::StageVariables;
use crate::transport::invocation::{self, InvocationHost, StdioHost};
use crate::transport::socket::SocketService;

impl Router {
    /// Serves the routes until the process stops (socket) or the host runs
    /// out of events (invocation, on stdin/stdout).
    ///
    /// `address` is only used in socket mode.
    ///
    /// # Errors
    ///
    /// `Bind` when the listener can't be bound, `Invocation` when the host
    /// fails to read or write.
    pub async fn serve(self, address: impl ToSocketAddrs, stage_variables: StageVariables) -> Result<(), ServeError> {
        match self.config().transport {
            TransportMode::Socket => self.serve_socket(address, stage_variables).await,
            TransportMode::Invocation { .. } => self.serve_invocation(StdioHost::stdio(), stage_variables).await,
        }
    }

    /// Answers the events of `host` one at a time.
    ///
    /// # Errors
    ///
    /// The first read or write failure of the host.
    pub async fn serve_invocation<H: InvocationHost>(mut self, mut host: H, stage_variables: StageVariables) -> Result<(), ServeError> {
        self.set_stage_variables(stage_variables);
        invocation::run(&self, &mut host).await?;
        Ok(())
    }

    async fn serve_socket(mut self, address: impl ToSocketAddrs, stage_variables: StageVariables) -> Result<(), ServeError> {
        self.set_stage_variables(stage_variables);

        let tcp_listener = TcpListener::bind(address).await.map_err(|source| {
            error!(cause = %source, "bind server error");
            ServeError::Bind { source }
        })?;
        if let Ok(local_addr) = tcp_listener.local_addr() {
            info!(%local_addr, "start listening");
        }

        let service = Arc::new(SocketService::new(Arc::new(self)));
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer, Some(remote_addr));
                match connection.process(service).await {
                    Ok(()) => {
                        info!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!("service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }
}
