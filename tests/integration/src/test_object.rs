//! Object CRUD, range and checksum integration tests.

#[cfg(test)]
mod tests {
    use atmos_client::{ContentSource, ObjectOptions};
    use atmos_model::{
        AtmosError, Checksum, ChecksumAlgorithm, Extent, Identifier, ObjectKey, ObjectPath,
    };

    use crate::mock::MockAtmos;

    const GETTYSBURG: &str = "Four score and seven years ago";

    #[tokio::test]
    async fn test_should_create_read_update_and_delete_object() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let options = ObjectOptions::default().with_content_type("text/plain");
        let id = client
            .create_object(None, ContentSource::from("hello, atmos!"), &options, None)
            .await
            .expect("create_object");
        let target = Identifier::from(id.clone());

        let content = client.read_object(&target, None, None).await.expect("read");
        assert_eq!(content.as_ref(), b"hello, atmos!");

        client
            .update_object(
                &target,
                ContentSource::from("goodbye"),
                None,
                &ObjectOptions::default(),
                None,
            )
            .await
            .expect("update_object");
        let content = client.read_object(&target, None, None).await.expect("read");
        assert_eq!(content.as_ref(), b"goodbye");

        client.delete_object(&target).await.expect("delete_object");
        let err = client
            .read_object(&target, None, None)
            .await
            .expect_err("deleted object should be gone");
        assert!(matches!(err, AtmosError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_should_sign_every_request_with_uid_and_date() {
        let server = MockAtmos::start().await;
        let client = server.client();

        client
            .create_object(None, ContentSource::from("x"), &ObjectOptions::default(), None)
            .await
            .expect("create_object");

        let request = server.last_request();
        assert_eq!(request.method, http::Method::POST);
        assert_eq!(request.path, "/rest/objects");
        assert_eq!(request.header("x-emc-uid").as_deref(), Some(crate::mock::UID));
        assert!(request.header("x-emc-date").is_some());
        assert!(request.header("x-emc-signature").is_some());
    }

    #[tokio::test]
    async fn test_should_create_object_at_path_and_key() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let path: Identifier = ObjectPath::new("/docs/readme.txt").expect("path").into();
        client
            .create_object(Some(&path), ContentSource::from("by path"), &ObjectOptions::default(), None)
            .await
            .expect("create at path");
        let content = client.read_object(&path, None, None).await.expect("read path");
        assert_eq!(content.as_ref(), b"by path");

        let key: Identifier = ObjectKey::new("pool1", "reports/q1").expect("key").into();
        client
            .create_object(Some(&key), ContentSource::from("by key"), &ObjectOptions::default(), None)
            .await
            .expect("create at key");
        assert_eq!(
            server.last_request().header("x-emc-pool").as_deref(),
            Some("pool1")
        );
        let content = client.read_object(&key, None, None).await.expect("read key");
        assert_eq!(content.as_ref(), b"by key");
    }

    #[tokio::test]
    async fn test_should_reject_create_at_object_id() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let id = client
            .create_object(None, ContentSource::from("x"), &ObjectOptions::default(), None)
            .await
            .expect("create_object");
        let requests_before = server.requests().len();

        let err = client
            .create_object(Some(&id.into()), ContentSource::from("y"), &ObjectOptions::default(), None)
            .await
            .expect_err("ID targets are server-assigned");
        assert!(matches!(err, AtmosError::Validation(_)), "got {err:?}");
        assert_eq!(server.requests().len(), requests_before);
    }

    #[tokio::test]
    async fn test_should_fail_create_when_path_exists() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let path: Identifier = ObjectPath::new("/dup.txt").expect("path").into();

        client
            .create_object(Some(&path), ContentSource::from("1"), &ObjectOptions::default(), None)
            .await
            .expect("first create");
        let err = client
            .create_object(Some(&path), ContentSource::from("2"), &ObjectOptions::default(), None)
            .await
            .expect_err("second create should fail");
        assert_eq!(err.server_code(), Some(1016));
    }

    #[tokio::test]
    async fn test_should_read_single_extent() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let id = client
            .create_object(None, ContentSource::from(GETTYSBURG), &ObjectOptions::default(), None)
            .await
            .expect("create_object");

        let extent = Extent::new(5, 5).expect("extent");
        let content = client
            .read_object(&id.into(), Some(extent), None)
            .await
            .expect("ranged read");
        assert_eq!(content.as_ref(), b"score");
        assert_eq!(
            server.last_request().header("range").as_deref(),
            Some("Bytes=5-9")
        );
    }

    #[tokio::test]
    async fn test_should_read_multiple_extents() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let id = client
            .create_object(
                None,
                ContentSource::from(GETTYSBURG),
                &ObjectOptions::default().with_content_type("text/plain"),
                None,
            )
            .await
            .expect("create_object");

        let extents = [
            Extent::new(27, 2).expect("extent"),
            Extent::new(9, 1).expect("extent"),
            Extent::new(5, 1).expect("extent"),
            Extent::new(4, 1).expect("extent"),
            Extent::new(27, 3).expect("extent"),
        ];
        let parts = client
            .read_object_ranges(&id.into(), &extents)
            .await
            .expect("multi-range read");

        let expected = ["ag", "e", "s", " ", "ago"];
        assert_eq!(parts.len(), expected.len());
        for ((part, extent), text) in parts.iter().zip(extents.iter()).zip(expected) {
            assert_eq!(part.data.as_ref(), text.as_bytes());
            assert_eq!(part.extent, *extent);
            assert_eq!(part.content_type, "text/plain");
        }
        assert_eq!(
            server.last_request().header("range").as_deref(),
            Some("Bytes=27-28,9-9,5-5,4-4,27-29")
        );
    }

    #[tokio::test]
    async fn test_should_read_one_extent_through_range_api() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let id = client
            .create_object(None, ContentSource::from(GETTYSBURG), &ObjectOptions::default(), None)
            .await
            .expect("create_object");

        let extent = Extent::new(0, 4).expect("extent");
        let parts = client
            .read_object_ranges(&id.into(), &[extent])
            .await
            .expect("single-range read");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].data.as_ref(), b"Four");
        assert_eq!(parts[0].extent, extent);
    }

    #[tokio::test]
    async fn test_should_update_extent_in_place() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let id = client
            .create_object(None, ContentSource::from("hello world"), &ObjectOptions::default(), None)
            .await
            .expect("create_object");
        let target = Identifier::from(id);

        client
            .update_object(
                &target,
                ContentSource::from("WORLD"),
                Some(Extent::new(6, 5).expect("extent")),
                &ObjectOptions::default(),
                None,
            )
            .await
            .expect("ranged update");
        let content = client.read_object(&target, None, None).await.expect("read");
        assert_eq!(content.as_ref(), b"hello WORLD");
    }

    #[tokio::test]
    async fn test_should_read_into_buffer() {
        let server = MockAtmos::start().await;
        let client = server.client();
        let id = client
            .create_object(None, ContentSource::from("buffered"), &ObjectOptions::default(), None)
            .await
            .expect("create_object");
        let target = Identifier::from(id);

        let mut buf = [0_u8; 16];
        let n = client
            .read_object_into(&target, None, &mut buf)
            .await
            .expect("read into");
        assert_eq!(&buf[..n], b"buffered");

        let mut small = [0_u8; 4];
        let err = client
            .read_object_into(&target, None, &mut small)
            .await
            .expect_err("buffer too small");
        assert!(matches!(err, AtmosError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_should_create_from_reader_and_slice() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let reader = ContentSource::from_reader(std::io::Cursor::new(b"streamed".to_vec()), 8);
        let id = client
            .create_object(None, reader, &ObjectOptions::default(), None)
            .await
            .expect("create from reader");
        let content = client.read_object(&id.into(), None, None).await.expect("read");
        assert_eq!(content.as_ref(), b"streamed");

        let slice = ContentSource::slice(bytes::Bytes::from_static(b"0123456789"), 2, 3)
            .expect("slice");
        let id = client
            .create_object(None, slice, &ObjectOptions::default(), None)
            .await
            .expect("create from slice");
        let content = client.read_object(&id.into(), None, None).await.expect("read");
        assert_eq!(content.as_ref(), b"234");
    }

    #[tokio::test]
    async fn test_should_verify_checksum_on_read() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let mut upload = Checksum::new(ChecksumAlgorithm::Sha1).expect("checksum");
        let id = client
            .create_object(
                None,
                ContentSource::from("hello"),
                &ObjectOptions::default(),
                Some(&mut upload),
            )
            .await
            .expect("create_object");
        assert_eq!(
            server.last_request().header("x-emc-wschecksum").as_deref(),
            Some("SHA1/5/aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d")
        );

        let mut download = Checksum::new(ChecksumAlgorithm::Sha1).expect("checksum");
        let content = client
            .read_object(&id.into(), None, Some(&mut download))
            .await
            .expect("checksummed read");
        assert_eq!(content.as_ref(), b"hello");
        assert_eq!(download.expected(), Some(&upload.current()));
    }

    #[tokio::test]
    async fn test_should_report_checksum_mismatch() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let mut upload = Checksum::new(ChecksumAlgorithm::Sha1).expect("checksum");
        let id = client
            .create_object(
                None,
                ContentSource::from("hello"),
                &ObjectOptions::default(),
                Some(&mut upload),
            )
            .await
            .expect("create_object");
        server.corrupt(&id, b"jello");

        let mut download = Checksum::new(ChecksumAlgorithm::Sha1).expect("checksum");
        let err = client
            .read_object(&id.into(), None, Some(&mut download))
            .await
            .expect_err("corrupted content should fail verification");
        assert!(matches!(err, AtmosError::ChecksumMismatch { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_should_skip_checksum_check_on_partial_read() {
        let server = MockAtmos::start().await;
        let client = server.client();

        let mut upload = Checksum::new(ChecksumAlgorithm::Md5).expect("checksum");
        let id = client
            .create_object(
                None,
                ContentSource::from(GETTYSBURG),
                &ObjectOptions::default(),
                Some(&mut upload),
            )
            .await
            .expect("create_object");

        let mut download = Checksum::new(ChecksumAlgorithm::Md5).expect("checksum");
        let content = client
            .read_object(
                &id.into(),
                Some(Extent::new(0, 4).expect("extent")),
                Some(&mut download),
            )
            .await
            .expect("partial read is not verified");
        assert_eq!(content.as_ref(), b"Four");
        assert_eq!(download.offset(), 4);
    }
}
