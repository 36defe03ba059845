// Shared quota server for the integration tests in this binary.
use std::sync::{OnceLock, mpsc};

use quota_server::interface_adapters::state::AppState;
use url::Url;

// Bearer token the test server accepts for member requests.
pub const MEMBER_TOKEN: &str = "integration-member-token";

static QUOTA_SERVER: OnceLock<Url> = OnceLock::new();

// Memory-backed server with template output, started on first use. Runs on
// its own thread and runtime so it outlives every `#[tokio::test]` runtime.
pub fn quota_server() -> &'static Url {
    QUOTA_SERVER.get_or_init(|| {
        let (bound, address) = mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("server runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral port");
                let local = listener.local_addr().expect("local addr");
                bound.send(local).expect("publish server address");

                let state = AppState::in_memory([MEMBER_TOKEN.to_string()]);
                quota_server::serve(listener, state).await.expect("quota server stopped");
            });
        });

        // The listener is bound before the address is sent, so connections
        // made from here on are accepted once `serve` starts polling.
        let local = address.recv().expect("quota server thread exited early");
        Url::parse(&format!("http://{local}/")).expect("server url")
    })
}
