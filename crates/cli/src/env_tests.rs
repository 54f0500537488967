// SPDX-License-Identifier: MIT

use serial_test::serial;

use super::data_dir;

fn clear_env() {
    std::env::remove_var("AOF_DATA_DIR");
}

#[test]
#[serial(aof_cli_env)]
fn aof_data_dir_env_wins() {
    clear_env();
    std::env::set_var("AOF_DATA_DIR", "/tmp/aof-cli-test-dir");
    assert_eq!(data_dir().unwrap(), std::path::PathBuf::from("/tmp/aof-cli-test-dir"));
    clear_env();
}

#[test]
#[serial(aof_cli_env)]
fn falls_back_to_a_state_dir_when_unset() {
    clear_env();
    let dir = data_dir().unwrap();
    assert!(dir.ends_with("aof"));
}
