#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{ param::Query, payload::Html, OpenApi };

use crate::utils::greeting::{greeting, welcome_message};
use crate::utils::hello_utils::{self, RequestDebug};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct HelloApi;

struct ReqGreeting
{
    name: Option<String>,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqGreeting {
    type Req = ReqGreeting;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(64);
        s.push_str("  Request parameters:");
        s.push_str("\n    name: ");
        match &self.name {
            Some(name) => s.push_str(name),
            None => s.push_str("<absent>"),
        }
        s
    }
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl HelloApi {
    #[oai(path = "/hello", method = "get")]
    async fn get_hello(&self, http_req: &Request, name: Query<Option<String>>) -> Html<String> {
        // Package the request parameters.
        let req = ReqGreeting { name: name.0 };

        // Conditional logging depending on log level.
        hello_utils::debug_request(http_req, &req);

        // Every request that reaches this handler succeeds.
        Html(req.process())
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl ReqGreeting {
    /** Compute the greeting and wrap it in the fixed html envelope.  An empty
     * name keeps the templated form, only a missing parameter falls back to
     * the welcome message.  The name is interpolated without escaping.
     */
    fn process(&self) -> String {
        let text = match &self.name {
            Some(name) => greeting(name),
            None => welcome_message(),
        };
        format!("<html><body>{}</body></html>", text)
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use poem::test::TestClient;
    use poem_openapi::OpenApiService;

    use crate::v1::hello::HelloApi;

    #[tokio::test]
    async fn get_hello_without_name() {
        let api = OpenApiService::new(HelloApi, "Hello Server", "0.1.0");
        let cli = TestClient::new(api);

        let resp = cli.get("/hello").send().await;
        resp.assert_status_is_ok();
        resp.assert_content_type("text/html; charset=utf-8");
        resp.assert_text("<html><body>Welcome to our demo application!</body></html>").await;
    }

    #[tokio::test]
    async fn get_hello_with_name() {
        let api = OpenApiService::new(HelloApi, "Hello Server", "0.1.0");
        let cli = TestClient::new(api);

        // The space arrives percent-encoded, the greeting carries it verbatim.
        let resp = cli.get("/hello?name=Test%20User").send().await;
        resp.assert_status_is_ok();
        resp.assert_content_type("text/html; charset=utf-8");
        resp.assert_text("<html><body>Hello, Test User!</body></html>").await;
    }

    #[tokio::test]
    async fn get_hello_with_empty_name() {
        let api = OpenApiService::new(HelloApi, "Hello Server", "0.1.0");
        let cli = TestClient::new(api);

        // Empty is present, not absent.
        let resp = cli.get("/hello?name=").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("<html><body>Hello, !</body></html>").await;
    }

    #[tokio::test]
    async fn concurrent_requests_are_not_cross_contaminated() {
        let api = OpenApiService::new(HelloApi, "Hello Server", "0.1.0");
        let cli = TestClient::new(api);

        // Issue simultaneous requests with distinct names and check that each
        // response corresponds to its own request.
        let names: Vec<String> = (0..16).map(|i| format!("caller-{}", i)).collect();
        let responses = futures::future::join_all(
            names.iter().map(|name| cli.get(format!("/hello?name={}", name)).send())
        ).await;

        for (name, resp) in names.iter().zip(responses) {
            resp.assert_status_is_ok();
            resp.assert_text(format!("<html><body>Hello, {}!</body></html>", name)).await;
        }
    }
}
