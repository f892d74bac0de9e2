use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::{BoxError, Handler};
use crate::protocol::{HttpError, HttpRequest, HttpResponse, Message, ParseError, RequestHead, SendError};

/// One client connection, answering requests one after another.
///
/// Each request is decoded completely (head and buffered body) before the
/// handler runs, and its response is flushed before the next request is
/// read, so pipelined requests are answered in order.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    remote_addr: Option<SocketAddr>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            remote_addr,
        }
    }

    /// Serves requests until the peer closes the connection, asks for it to be
    /// closed, or sends something that can't be parsed.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` when a request is malformed (after answering it
    /// with 400) or the response can't be written.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header(head))) => {
                    let keep_alive = head.keep_alive();
                    self.do_process(head, &handler).await?;
                    if !keep_alive {
                        debug!("connection not keep-alive, close it");
                        return Ok(());
                    }
                }

                Some(Ok(Message::Body(_))) => {
                    error!("receive request body before its head");
                    self.send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!("can't receive next request, cause {}", e);
                    self.send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, head: RequestHead, handler: &Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        if head.expects_continue() {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            info!("receive expect request header, sent continue response");
        }

        let body = match self.framed_read.next().await {
            Some(Ok(Message::Body(body))) => body,
            Some(Ok(Message::Header(_))) => {
                self.send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                return Err(ParseError::invalid_body("receive a new head while waiting for the body").into());
            }
            Some(Err(e)) => {
                error!("can't read request body, cause {}", e);
                self.send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                return Err(e.into());
            }
            None => return Err(ParseError::invalid_body("connection closed before the body was complete").into()),
        };

        let request = HttpRequest::new(head, body, self.remote_addr);
        let response = match handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                let e: BoxError = e.into();
                error!("handle response error, cause: {}", e);
                build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        self.send_response(response).await
    }

    async fn send_response(&mut self, response: HttpResponse) -> Result<(), HttpError> {
        self.framed_write.send(response).await?;
        Ok(())
    }
}

fn build_error_response(status_code: StatusCode) -> HttpResponse {
    HttpResponse::new(status_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use tokio::io::{AsyncReadExt, duplex};

    async fn echo(request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let (head, body, _) = request.into_parts();
        Ok(HttpResponse::new(StatusCode::OK).with_header("X-Path", head.path()).with_body(body))
    }

    async fn fail(_request: HttpRequest) -> Result<HttpResponse, BoxError> {
        Err("boom".into())
    }

    async fn roundtrip<H: Handler + 'static>(handler: H, input: &[u8]) -> String {
        let (client, server) = duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server);
        let task = tokio::spawn(HttpConnection::new(reader, writer, None).process(Arc::new(handler)));

        let (mut client_reader, mut client_writer) = tokio::io::split(client);
        client_writer.write_all(input).await.unwrap();
        client_writer.shutdown().await.unwrap();

        let mut output = String::new();
        client_reader.read_to_string(&mut output).await.unwrap();
        let _ = task.await.unwrap();
        output
    }

    #[tokio::test]
    async fn answers_pipelined_requests_in_order() {
        let output = roundtrip(
            make_handler(echo),
            b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\nhiGET /b HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await;

        let first = output.find("X-Path: /a").unwrap();
        let second = output.find("X-Path: /b").unwrap();
        assert!(first < second);
        assert!(output.contains("Content-Length: 2\r\n\r\nhi"));
    }

    #[tokio::test]
    async fn handler_error_becomes_500() {
        let output = roundtrip(make_handler(fail), b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_gets_400() {
        let output = roundtrip(make_handler(echo), b"GET / HTTP/1.1\r\nContent-Length: x\r\n\r\n").await;
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn sends_continue_before_body() {
        let output = roundtrip(
            make_handler(echo),
            b"PUT /c HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc",
        )
        .await;
        assert!(output.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
    }
}
