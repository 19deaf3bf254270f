//! Integration tests for the `example run` command.
use factory_model::cli::RunOpts;
use factory_model::cli::example::handle_example_run_command;
use factory_model::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command, with a depth limit the model stays within
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("FACTORY_MODEL_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        max_graph_depth: Some(3),
        ..RunOpts::default()
    };
    handle_example_run_command("desalination", &opts, Some(Settings::default())).unwrap();
    assert!(tempdir.path().join("capacities.csv").is_file());
}
