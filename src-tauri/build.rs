fn main() {
    // The single app command, reachable from the remote page through the
    // `allow-change-resolution` permission in capabilities/remote-bridge.json.
    tauri_build::try_build(
        tauri_build::Attributes::new()
            .app_manifest(tauri_build::AppManifest::new().commands(&["change_resolution"])),
    )
    .expect("failed to run tauri-build");
}
