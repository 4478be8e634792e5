//! Error mapping integration tests.

#[cfg(test)]
mod tests {
    use atmos_client::{ContentSource, ObjectOptions};
    use atmos_model::{AtmosError, Identifier, ObjectId, ObjectPath};
    use http::StatusCode;

    use crate::mock::MockAtmos;

    fn missing_id() -> Identifier {
        ObjectId::new("0123456789abcdef0123456789abcdef0123456789ab")
            .expect("object id")
            .into()
    }

    #[tokio::test]
    async fn test_should_map_missing_object_to_not_found() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let err = client
            .get_user_metadata(&missing_id(), None)
            .await
            .expect_err("object does not exist");
        assert!(matches!(err, AtmosError::NotFound { .. }), "got {err:?}");
        assert_eq!(err.server_code(), Some(1003));

        let path: Identifier = ObjectPath::new("/nowhere.txt").expect("path").into();
        let err = client.delete_object(&path).await.expect_err("path does not exist");
        assert!(matches!(err, AtmosError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_should_map_bad_secret_to_signature_mismatch() {
        let server = MockAtmos::start().await;
        let mut config = server.config();
        config.shared_secret = "AAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_owned();
        let client = server.client_from(config);

        let err = client
            .create_object(None, ContentSource::from("x"), &ObjectOptions::default(), None)
            .await
            .expect_err("signature should not verify");
        assert!(matches!(err, AtmosError::SignatureMismatch { .. }), "got {err:?}");
        assert_eq!(err.server_code(), Some(1032));
    }

    #[tokio::test]
    async fn test_should_surface_server_error_code() {
        let server = MockAtmos::start().await;
        let client = server.client();
        server.fail_next(StatusCode::INTERNAL_SERVER_ERROR, Some(1001));

        let err = client
            .get_service_information()
            .await
            .expect_err("injected failure");
        match err {
            AtmosError::Server {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 500);
                assert_eq!(code, 1001);
                assert_eq!(message, "injected failure");
            }
            other => panic!("expected a server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_fall_back_to_http_error_without_error_document() {
        let server = MockAtmos::start().await;
        let client = server.client();
        server.fail_next(StatusCode::BAD_GATEWAY, None);

        let err = client
            .get_service_information()
            .await
            .expect_err("injected failure");
        match err {
            AtmosError::Http { status, reason } => {
                assert_eq!(status, 502);
                assert_eq!(reason, "Bad Gateway");
            }
            other => panic!("expected an HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_report_connection_failure() {
        let server = MockAtmos::start().await;
        let mut config = server.config();
        config.port = 1;
        let client = server.client_from(config);

        let err = client
            .get_service_information()
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(err, AtmosError::Connection(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_should_recover_after_injected_failure() {
        let server = MockAtmos::start().await;
        let client = server.client();
        server.fail_next(StatusCode::SERVICE_UNAVAILABLE, Some(1040));

        assert!(client.get_service_information().await.is_err());
        client
            .get_service_information()
            .await
            .expect("next request succeeds");
    }
}
