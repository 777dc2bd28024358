//! Tests against the backend configured in `~/.goss.toml`.
//!
//! They talk to a real bucket, so they are ignored by default:
//! `cargo test -p goss --test remote -- --ignored --test-threads=1`

use std::path::PathBuf;

use goss::{Goss, S3Storage};
use tempfile::TempDir;

const KEY: &str = "goss-remote-test/foo.txt";
const PREFIX: &str = "goss-remote-test/";

struct Fixture {
    goss: Goss,
    temp: TempDir,
    foo: PathBuf,
}

impl Fixture {
    async fn new() -> Self {
        let goss = Goss::from_user_home().expect("~/.goss.toml must configure a backend");
        let temp = TempDir::new().unwrap();
        let foo = temp.path().join("foo.txt");
        std::fs::write(&foo, "foo").unwrap();
        Self { goss, temp, foo }
    }

    async fn upload(&self) {
        self.goss.put(KEY, &self.foo).await.unwrap();
    }

    async fn tear_down(&self) {
        self.goss.delete(KEY).await.unwrap();
    }
}

#[tokio::test]
#[ignore]
async fn remote_put_and_get() {
    let fixture = Fixture::new().await;
    fixture.upload().await;

    assert!(fixture.goss.exists(KEY).await.unwrap());
    assert_eq!(fixture.goss.get(KEY).await.unwrap(), "foo");

    let missing = format!("{}not_exists", KEY);
    let err = fixture.goss.get(&missing).await.unwrap_err();
    assert!(err.is_not_found());

    fixture.tear_down().await;
}

#[tokio::test]
#[ignore]
async fn remote_save() {
    let fixture = Fixture::new().await;
    fixture.upload().await;

    let target = fixture.temp.path().join("foo1.txt");
    fixture.goss.save(KEY, &target).await.unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "foo");

    fixture.tear_down().await;
}

#[tokio::test]
#[ignore]
async fn remote_size() {
    let fixture = Fixture::new().await;
    fixture.upload().await;

    assert_eq!(fixture.goss.size(KEY).await.unwrap(), 3);

    let missing = format!("{}not_exists", KEY);
    let err = fixture.goss.size(&missing).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));

    fixture.tear_down().await;
}

#[tokio::test]
#[ignore]
async fn remote_delete_is_idempotent() {
    let fixture = Fixture::new().await;
    fixture.upload().await;

    fixture.goss.delete(KEY).await.unwrap();
    assert!(!fixture.goss.exists(KEY).await.unwrap());
    fixture.goss.delete(KEY).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn remote_files() {
    let fixture = Fixture::new().await;
    fixture.upload().await;

    let files = fixture.goss.files(PREFIX).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].key(), KEY);
    assert_eq!(files[0].size(), 3);

    fixture.tear_down().await;
}

#[tokio::test]
#[ignore]
async fn remote_escape_hatch() {
    let fixture = Fixture::new().await;
    let storage = fixture.goss.storage().unwrap();

    if matches!(storage.name(), "aliyun" | "tencent") {
        let s3 = storage.as_any().downcast_ref::<S3Storage>().unwrap();
        assert!(!s3.bucket().name().is_empty());
    }
}
