//! Proxy sub-resource integration tests.

#[cfg(test)]
mod tests {
    use crate::start;

    #[tokio::test]
    async fn test_should_forward_with_dry_run_restored() {
        let server = start().await;
        server.create_server("prod", "cn-beijing").await;

        let resp = server
            .http
            .post(format!(
                "{}?path=/api/v1/namespaces/default/apps&dryRun=All",
                server.proxy_url("prod")
            ))
            .header("content-type", "application/yaml")
            .body("kind: App")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.headers()["x-vendor"], "sae");

        let echo: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(echo["method"], "POST");
        assert_eq!(echo["path"], "/api/v1/namespaces/default/apps?dryRun=All");
        assert_eq!(echo["content"], "kind: App");
        assert_eq!(echo["header"]["Content-Type"][0], "application/yaml");
        assert!(
            echo["authorization"]
                .as_str()
                .unwrap()
                .starts_with("acs ak-prod:")
        );
    }

    #[tokio::test]
    async fn test_should_forward_sub_path_and_query() {
        let server = start().await;
        server.create_server("prod", "").await;

        let resp = server
            .http
            .get(format!("{}/api/v1/namespaces?limit=1", server.proxy_url("prod")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let echo: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(echo["method"], "GET");
        assert_eq!(echo["path"], "/api/v1/namespaces?limit=1");
        assert_eq!(echo["content"], "");
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_unknown_target() {
        let server = start().await;
        let resp = server
            .http
            .get(format!("{}?path=/", server.proxy_url("ghost")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let status: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(status["message"], "no such cluster ghost");
        assert_eq!(status["reason"], "NotFound");
    }

    #[tokio::test]
    async fn test_should_surface_vendor_failure_as_bad_gateway() {
        let server = start().await;
        server.create_server("prod", "").await;
        let resp = server
            .http
            .get(format!("{}?path=/fail", server.proxy_url("prod")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
        let status: serde_json::Value = resp.json().await.unwrap();
        assert!(
            status["message"]
                .as_str()
                .unwrap()
                .contains("ServiceUnavailable")
        );
    }

    #[tokio::test]
    async fn test_should_time_out_slow_vendor() {
        let server = start().await;
        server.create_server("prod", "").await;
        let resp = server
            .http
            .get(format!("{}?path=/slow", server.proxy_url("prod")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_should_reject_unsupported_method() {
        let server = start().await;
        server.create_server("prod", "").await;
        let resp = server
            .http
            .request(reqwest::Method::TRACE, server.proxy_url("prod"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_should_serve_concurrent_proxy_requests() {
        let server = start().await;
        server.create_server("a", "cn-hangzhou").await;
        server.create_server("b", "cn-shanghai").await;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let server = server.clone();
                tokio::spawn(async move {
                    let name = if i % 2 == 0 { "a" } else { "b" };
                    let resp = server
                        .http
                        .put(format!("{}/items/{i}?dryRun=true", server.proxy_url(name)))
                        .body(format!("body-{i}"))
                        .send()
                        .await
                        .unwrap();
                    assert_eq!(resp.status(), reqwest::StatusCode::OK);
                    let echo: serde_json::Value = resp.json().await.unwrap();
                    assert_eq!(echo["path"], format!("/items/{i}?dryRun=true"));
                    assert_eq!(echo["content"], format!("body-{i}"));
                    assert!(
                        echo["authorization"]
                            .as_str()
                            .unwrap()
                            .starts_with(&format!("acs ak-{name}:"))
                    );
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
    }
}
