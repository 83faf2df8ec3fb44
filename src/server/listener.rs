use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::http::connection::Connection;
use crate::vanity::Resolver;

pub async fn run(listen_addr: &str, resolver: Arc<Resolver>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    serve(listener, resolver).await
}

/// Accepts connections on an already bound listener, one task each.
pub async fn serve(listener: TcpListener, resolver: Arc<Resolver>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, resolver);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
