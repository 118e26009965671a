use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn write_recording(dir: &Path, id: &str) {
    for pos in ["A", "B", "C"] {
        fs::write(dir.join(format!("20240703_131044_{id}_N_{pos}.mp4")), b"").expect("write clip");
    }
}

fn dashstitch() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dashstitch"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn stitch_help_lists_flags() {
    let output = dashstitch()
        .arg("stitch")
        .arg("--help")
        .output()
        .expect("stitch --help runs");

    assert!(output.status.success());
    let text = combined_output(&output);
    for flag in ["--parallelism", "--src", "--dst", "--combine"] {
        assert!(text.contains(flag), "help text missing {flag}: {text}");
    }
}

#[test]
fn missing_source_fails_with_exit_code_2() {
    let tmp = TempDir::new().expect("tempdir");
    let output = dashstitch()
        .arg("stitch")
        .arg("-s")
        .arg(tmp.path().join("absent"))
        .arg("-d")
        .arg(tmp.path().join("out"))
        .output()
        .expect("stitch runs");

    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("does not exist"), "{text}");
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn source_file_is_not_a_directory() {
    let tmp = TempDir::new().expect("tempdir");
    let file = tmp.path().join("clip.mp4");
    fs::write(&file, b"").expect("write file");

    let output = dashstitch()
        .arg("combine")
        .arg("-s")
        .arg(&file)
        .arg("-d")
        .arg(tmp.path().join("out"))
        .output()
        .expect("combine runs");

    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("is not a directory"));
}

#[test]
fn destination_equal_to_source_is_rejected() {
    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    fs::create_dir(&src).expect("mkdir");
    write_recording(&src, "0001");

    let output = dashstitch()
        .arg("stitch")
        .arg("-s")
        .arg(&src)
        .arg("-d")
        .arg(src.join("."))
        .output()
        .expect("stitch runs");

    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("is the source directory"), "{text}");
    assert!(!src.join("output_1.mp4").exists());
}

#[test]
fn malformed_name_names_the_file() {
    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    fs::create_dir(&src).expect("mkdir");
    write_recording(&src, "0001");
    fs::write(src.join("20240703_131044_0002_N.mp4"), b"").expect("write clip");

    let output = dashstitch()
        .arg("stitch")
        .arg("-s")
        .arg(&src)
        .arg("-d")
        .arg(tmp.path().join("out"))
        .output()
        .expect("stitch runs");

    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("20240703_131044_0002_N.mp4"), "{text}");
}

#[test]
fn groups_json_lists_sorted_groups() {
    let tmp = TempDir::new().expect("tempdir");
    write_recording(tmp.path(), "0417");
    write_recording(tmp.path(), "0003");

    let output = dashstitch()
        .arg("groups")
        .arg("-s")
        .arg(tmp.path())
        .arg("--json")
        .output()
        .expect("groups runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    let groups: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let ids: Vec<u64> = groups
        .as_array()
        .expect("array")
        .iter()
        .map(|g| g["group_id"].as_u64().expect("group id"))
        .collect();
    assert_eq!(ids, vec![3, 417]);
    assert_eq!(groups[0]["files"].as_array().map(Vec::len), Some(3));
    assert_eq!(groups[0]["files"][0]["position"], "front");
    assert_eq!(groups[0]["timestamp"], "2024-07-03T13:10:44");
}

#[cfg(unix)]
#[test]
fn stitch_and_combine_with_stub_ffmpeg() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    fs::create_dir(&src).expect("mkdir");
    write_recording(&src, "0002");
    write_recording(&src, "0010");

    // Writes its last argument, which is the output path for every invocation.
    let stub = tmp.path().join("ffmpeg-stub");
    fs::write(
        &stub,
        "#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\nfor last; do :; done\necho stub > \"$last\"\n",
    )
    .expect("write stub");
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).expect("chmod");

    let final_path = tmp.path().join("final/all.mp4");
    let output = dashstitch()
        .arg("--ffmpeg")
        .arg(&stub)
        .arg("stitch")
        .arg("-p")
        .arg("2")
        .arg("-s")
        .arg(&src)
        .arg("-d")
        .arg(&dst)
        .arg("--combine")
        .arg(&final_path)
        .output()
        .expect("stitch runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    assert!(dst.join("output_2.mp4").is_file());
    assert!(dst.join("output_10.mp4").is_file());
    assert!(final_path.is_file());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.find("Stitched group #2").expect("group 2 reported");
    let second = stdout.find("Stitched group #10").expect("group 10 reported");
    assert!(first < second, "{stdout}");
}
