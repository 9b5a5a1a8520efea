use httpmock::MockServer;

/// Starts a fresh `httpmock::MockServer` standing in for the REST and token endpoints.
pub fn start_mock_server() -> MockServer {
    MockServer::start()
}
