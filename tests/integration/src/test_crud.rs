//! `saeapiservers` CRUD integration tests.

#[cfg(test)]
mod tests {
    use crate::{record, start};

    #[tokio::test]
    async fn test_should_run_record_lifecycle() {
        let server = start().await;
        let created = server.create_server("prod", "cn-beijing").await;
        assert_eq!(created["kind"], "SAEAPIServer");
        assert!(created["metadata"]["uid"].is_string());

        let resp = server.http.get(server.item_url("prod")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let fetched: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(fetched["spec"]["accessKeyId"], "ak-prod");

        let mut replacement = record("prod", "cn-shanghai");
        replacement["metadata"]["resourceVersion"] = fetched["metadata"]["resourceVersion"].clone();
        let resp = server
            .http
            .put(server.item_url("prod"))
            .json(&replacement)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let updated: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(updated["spec"]["region"], "cn-shanghai");
        assert_eq!(updated["metadata"]["uid"], created["metadata"]["uid"]);

        let resp = server
            .http
            .patch(server.item_url("prod"))
            .header("content-type", "application/merge-patch+json")
            .body(r#"{"spec":{"accessKeyId":"ak-rotated"}}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let patched: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(patched["spec"]["accessKeyId"], "ak-rotated");
        assert_eq!(patched["spec"]["region"], "cn-shanghai");

        let resp = server.http.delete(server.item_url("prod")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = server.http.get(server.item_url("prod")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_list_records_in_name_order() {
        let server = start().await;
        server.create_server("zeta", "").await;
        server.create_server("alpha", "").await;

        let list: serde_json::Value = server
            .http
            .get(server.collection_url())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list["kind"], "SAEAPIServerList");
        let names: Vec<_> = list["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["metadata"]["name"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_should_render_table_for_table_accept() {
        let server = start().await;
        server.create_server("prod", "cn-beijing").await;

        let resp = server
            .http
            .get(server.collection_url())
            .header("accept", "application/json;as=Table;v=v1;g=meta.k8s.io")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let table: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(table["kind"], "Table");
        assert_eq!(table["columnDefinitions"][1]["name"], "Region");
        assert_eq!(table["rows"][0]["cells"][1], "cn-beijing");
    }

    #[tokio::test]
    async fn test_should_reject_invalid_and_duplicate_records() {
        let server = start().await;

        let mut invalid = record("prod", "");
        invalid["spec"]["accessKeySecret"] = serde_json::json!("");
        let resp = server
            .http
            .post(server.collection_url())
            .json(&invalid)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        server.create_server("prod", "").await;
        let resp = server
            .http
            .post(server.collection_url())
            .json(&record("prod", ""))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
        let status: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(status["reason"], "AlreadyExists");
    }

    #[tokio::test]
    async fn test_should_serve_discovery_document() {
        let server = start().await;
        let doc: serde_json::Value = server
            .http
            .get(server.url("/apis/sae.alibaba-cloud.oam.dev/v1alpha1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(doc["kind"], "APIResourceList");
        assert_eq!(doc["resources"][1]["name"], "saeapiservers/proxy");
    }
}
