use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Builds a producer record in the shape returned by a directory's `/nodes` endpoint.
pub fn producer(remote_address: &str, tcp_port: u16, http_port: u16) -> Value {
    json!({
        "remote_address": remote_address,
        "host_name": "test-node",
        "broadcast_address": "test-node",
        "tcp_port": tcp_port,
        "http_port": http_port,
        "version": "1.2.1",
        "topics": [],
    })
}

#[derive(Clone)]
enum NodesReply {
    Producers(Vec<Value>),
    Raw(StatusCode, String),
}

struct State {
    reply: Mutex<NodesReply>,
    delay: Mutex<Option<Duration>>,
    created_topics: Mutex<Vec<String>>,
    num_requests: AtomicUsize,
}

/// An in-process directory service which serves a configurable node list.
///
/// The server also answers `POST /topic/create` so it can stand in for the
/// admin endpoint of a broker node.
pub struct MockDirectory {
    addr: SocketAddr,
    state: Arc<State>,
    handle: JoinHandle<()>,
}

impl MockDirectory {
    /// Spawns the directory server on an OS allocated port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Bind mock directory");
        listener
            .set_nonblocking(true)
            .expect("Set listener to non-blocking");
        let addr = listener.local_addr().expect("Get local address");

        let state = Arc::new(State {
            reply: Mutex::new(NodesReply::Producers(Vec::new())),
            delay: Mutex::new(None),
            created_topics: Mutex::new(Vec::new()),
            num_requests: AtomicUsize::new(0),
        });

        let service_state = state.clone();
        let make_service = make_service_fn(move |_| {
            let state = service_state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle_request(req, state.clone())
                }))
            }
        });

        let server = hyper::Server::from_tcp(listener)
            .expect("Create server from listener")
            .http1_keepalive(false)
            .serve(make_service);

        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = ?e, "Mock directory failed to handle requests.");
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    #[inline]
    /// The socket address the directory is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[inline]
    /// The directory endpoint in `host:port` form.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Sets the producers returned by subsequent `/nodes` requests.
    pub fn set_producers(&self, producers: Vec<Value>) {
        *self.state.reply.lock() = NodesReply::Producers(producers);
    }

    /// Makes subsequent `/nodes` requests return the given status and raw body.
    pub fn set_response(&self, status: StatusCode, body: impl Into<String>) {
        *self.state.reply.lock() = NodesReply::Raw(status, body.into());
    }

    /// Delays every response by the given duration.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.state.delay.lock() = delay;
    }

    /// The topics created via `POST /topic/create` so far.
    pub fn created_topics(&self) -> Vec<String> {
        self.state.created_topics.lock().clone()
    }

    /// The number of requests the directory has received.
    pub fn num_requests(&self) -> usize {
        self.state.num_requests.load(Ordering::Relaxed)
    }

    /// Stops serving requests, any further connections are refused.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for MockDirectory {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    req: Request<Body>,
    state: Arc<State>,
) -> Result<Response<Body>, Infallible> {
    state.num_requests.fetch_add(1, Ordering::Relaxed);

    let delay = *state.delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/nodes") => {
            let reply = state.reply.lock().clone();
            match reply {
                NodesReply::Producers(producers) => {
                    let body = json!({ "producers": producers }).to_string();
                    build_response(StatusCode::OK, body)
                },
                NodesReply::Raw(status, body) => build_response(status, body),
            }
        },
        (&Method::POST, "/topic/create") => {
            let topic = req
                .uri()
                .query()
                .and_then(|query| query.strip_prefix("topic="))
                .unwrap_or_default()
                .to_string();
            state.created_topics.lock().push(topic);
            build_response(StatusCode::OK, String::new())
        },
        _ => build_response(StatusCode::NOT_FOUND, String::new()),
    };

    Ok(response)
}

fn build_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    (*response.status_mut()) = status;
    response
}
