use httpmock::MockServer;

/// Starts a fresh `httpmock::MockServer` for backend and network tests.
pub fn start_mock_server() -> MockServer {
    MockServer::start()
}
