use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind `addr`, moving on to the next port while the current one is taken.
/// Gives up after `retries` extra ports and returns the last bind error.
pub async fn bind_with_retry(addr: &str, retries: u16) -> io::Result<TcpListener> {
    let mut socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut attempt = 0;
    loop {
        match TcpListener::bind(socket_addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempt < retries => {
                let Some(next) = socket_addr.port().checked_add(1) else {
                    return Err(e);
                };
                tracing::warn!("Port {} in use, trying {}", socket_addr.port(), next);
                socket_addr.set_port(next);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn taken_port_moves_to_next() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        if port > u16::MAX - 10 {
            return;
        }
        let listener = bind_with_retry(&format!("127.0.0.1:{}", port), 10)
            .await
            .unwrap();
        let bound = listener.local_addr().unwrap().port();
        assert!(bound > port && bound <= port + 10);
    }

    #[tokio::test]
    async fn no_retries_reports_conflict() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let err = bind_with_retry(&format!("127.0.0.1:{}", port), 0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn malformed_address_is_invalid_input() {
        let err = bind_with_retry("not an address", 3).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
