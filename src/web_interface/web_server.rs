use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use super::routes::api_routes;
use crate::error_handling::types::WebError;
use crate::session_management::session_manager::SessionManager;

/// Web server for the HTTP API
pub struct WebServer {
    session_manager: Arc<SessionManager>,
}

impl WebServer {
    /// Create a new WebServer instance
    pub fn new(session_manager: Arc<SessionManager>) -> Self {
        Self { session_manager }
    }

    /// Resolves the listening address without binding it.
    pub fn socket_addr(bind_address: &str, port: u16) -> Result<SocketAddr, WebError> {
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|_| WebError::BadBindAddress(bind_address.to_string()))?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Binds the listening socket, so a taken port is reported before serving starts.
    pub async fn bind(bind_address: &str, port: u16) -> Result<TcpListener, WebError> {
        let addr = Self::socket_addr(bind_address, port)?;
        TcpListener::bind(addr).await.map_err(|e| {
            error!("Unable to bind web interface on {}: {}", addr, e);
            WebError::ServerFailed(format!("cannot bind {}: {}", addr, e))
        })
    }

    /// Serves the API on an already bound listener until the task running it is dropped.
    pub async fn serve(&self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!("web interface listening on http://{}", addr);
        }
        let routes = api_routes(self.session_manager.clone());
        warp::serve(routes).incoming(listener).run().await;
    }

    /// Binds `bind_address:port` and serves the API on it.
    pub async fn start(&self, bind_address: &str, port: u16) -> Result<(), WebError> {
        let listener = Self::bind(bind_address, port).await?;
        self.serve(listener).await;
        Ok(())
    }
}
