//! Starting installed games.

mod common;

use std::fs;
use std::time::Duration;

use arcade_core::{InstallError, PackageId};

use common::{Fixture, STELLAR_QUEST, primary, stellar_quest};

async fn installed_fixture() -> Fixture {
    let fx = Fixture::new(vec![stellar_quest("2.2.3")]).await;
    fx.serve_game(&primary("2.2.3"), "2.2.3");
    fx.launcher
        .install(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap();
    fx
}

#[cfg(unix)]
#[tokio::test]
async fn launch_runs_executable_in_install_dir() {
    use std::os::unix::fs::PermissionsExt;

    let fx = installed_fixture().await;
    let dir = fx.paths.package_dir(STELLAR_QUEST);
    let exe = dir.join("StellarQuest.exe");
    fs::write(&exe, "#!/bin/sh\necho started > launched.txt\n").unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

    let launched = fx
        .launcher
        .launch(&PackageId::from(STELLAR_QUEST))
        .await
        .unwrap();
    assert_eq!(launched.executable, exe);
    assert!(launched.pid.is_some());

    let marker = dir.join("launched.txt");
    for _ in 0..200 {
        if marker.is_file() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fs::read_to_string(marker).unwrap().trim(), "started");
}

#[tokio::test]
async fn launch_requires_an_install() {
    let fx = Fixture::new(vec![stellar_quest("2.2.3")]).await;
    let err = fx
        .launcher
        .launch(&PackageId::from(STELLAR_QUEST))
        .await
        .unwrap_err();
    assert!(matches!(err, InstallError::NotInstalled { .. }));
}

#[tokio::test]
async fn launch_reports_missing_executable() {
    let fx = installed_fixture().await;
    let exe = fx.paths.package_dir(STELLAR_QUEST).join("StellarQuest.exe");
    fs::remove_file(&exe).unwrap();

    let err = fx
        .launcher
        .launch(&PackageId::from(STELLAR_QUEST))
        .await
        .unwrap_err();
    assert!(
        matches!(err, InstallError::ExecutableMissing { ref path, .. } if path.ends_with("StellarQuest.exe"))
    );
    assert!(err.user_message().contains("repair"));
}
