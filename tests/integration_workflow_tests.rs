use serial_test::serial;
use shelf::app::config::Config;
use shelf::app::state::AppState;
use shelf::cli::error;
use shelf::cli::handler::handle_command;
use shelf::cli::{BatchAction, Commands, LabelAction, SelectArg, SortArg};
use shelf::download::{DownloadIndex, DownloadRecord, DownloadState, LabelStore};
use shelf::progress::ReadProgress;
use shelf::util::paths::set_config_dir_override;
use tempfile::TempDir;
use tokio::runtime::Handle;

// Initialize logging once for all tests
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Point the config directory at a fresh temp dir with downloads inside it
fn setup_config_dir() -> TempDir {
    init_logging();
    let dir = TempDir::new().unwrap();
    set_config_dir_override(Some(dir.path().to_path_buf()));

    let mut config = Config::default();
    config.storage.download_root = dir.path().join("Downloads");
    config.save().unwrap();
    dir
}

fn load_state() -> AppState {
    AppState::load(Handle::current()).unwrap()
}

#[tokio::test]
#[serial]
async fn test_state_survives_restart() {
    let _dir = setup_config_dir();

    {
        let state = load_state();
        let mut labels = state.label_list();
        labels.add_label("Comics").unwrap();
        state
            .library
            .add_record(DownloadRecord::new(1, "t1", "First"))
            .unwrap();
        state
            .library
            .add_record(DownloadRecord::new(2, "t2", "Second"))
            .unwrap();

        let mut list = state.download_list(None);
        list.on_item_long_click(0);
        list.batch_move(Some("Comics")).unwrap();
        list.select_drawer_label(1);
        assert_eq!(list.label(), Some("Comics"));
        list.teardown();
        state.preferences.flush().await;
    }

    let state = load_state();
    assert!(state.library.contains("Comics"));
    let list = state.download_list(None);
    assert_eq!(list.label(), Some("Comics"));
    let ids: Vec<u64> = list.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2]);
    assert_eq!(state.library.record(1).unwrap().label, None);

    set_config_dir_override(None);
}

#[tokio::test]
#[serial]
async fn test_label_commands_exit_codes() {
    let _dir = setup_config_dir();
    let state = load_state();

    let add = |name: &str| Commands::Labels {
        action: LabelAction::Add {
            name: name.to_string(),
        },
    };
    assert_eq!(handle_command(add("A"), state.clone()).await, error::SUCCESS);
    assert_eq!(handle_command(add("A"), state.clone()).await, error::INVALID_INPUT);
    assert_eq!(handle_command(add("Default"), state.clone()).await, error::INVALID_INPUT);

    let rename = Commands::Labels {
        action: LabelAction::Rename {
            old: "Missing".to_string(),
            new: "B".to_string(),
        },
    };
    assert_eq!(handle_command(rename, state.clone()).await, error::NOT_FOUND);

    let bad_move = Commands::Labels {
        action: LabelAction::Move { from: 0, to: 3 },
    };
    assert_eq!(handle_command(bad_move, state.clone()).await, error::INVALID_INPUT);

    let pin = Commands::Labels {
        action: LabelAction::Pin {
            name: "A".to_string(),
        },
    };
    assert_eq!(handle_command(pin, state.clone()).await, error::SUCCESS);

    set_config_dir_override(None);
}

#[tokio::test]
#[serial]
async fn test_list_and_batch_commands() {
    let dir = setup_config_dir();
    let state = load_state();
    for (id, total) in [(1, 5), (2, 20), (3, 1)] {
        state
            .library
            .add_record(
                DownloadRecord::new(id, format!("t{id}"), format!("Gallery {id}"))
                    .with_pages(0, total),
            )
            .unwrap();
    }

    let list = Commands::List {
        label: None,
        sort: Some(SortArg::Pages),
        json: true,
    };
    assert_eq!(handle_command(list, state.clone()).await, error::SUCCESS);
    let order: Vec<u64> = state
        .library
        .records(state.library.default_projection().id())
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(order, vec![2, 1, 3]);

    let missing_label = Commands::List {
        label: Some("Nope".to_string()),
        sort: None,
        json: false,
    };
    assert_eq!(handle_command(missing_label, state.clone()).await, error::NOT_FOUND);

    let out_of_range = Commands::Batch {
        action: BatchAction::Start,
        positions: vec![0, 7],
        label: None,
        to: None,
        remove_files: false,
    };
    assert_eq!(handle_command(out_of_range, state.clone()).await, error::INVALID_INPUT);
    assert_eq!(state.library.record(2).unwrap().state, DownloadState::None);

    // Position 0 is gallery 2 after the sort
    let record = state.library.record(2).unwrap();
    state
        .progress
        .resolver()
        .store(
            &record,
            ReadProgress {
                current_page: 2,
                total_pages: 20,
            },
        )
        .unwrap();
    let gallery_dir = dir.path().join("Downloads").join("2-Gallery 2");
    assert!(gallery_dir.exists());

    let delete = Commands::Batch {
        action: BatchAction::Delete,
        positions: vec![0],
        label: None,
        to: None,
        remove_files: true,
    };
    assert_eq!(handle_command(delete, state.clone()).await, error::SUCCESS);
    assert!(state.library.record(2).is_none());
    assert!(!gallery_dir.exists());

    set_config_dir_override(None);
}

#[tokio::test]
#[serial]
async fn test_toolbar_commands() {
    let _dir = setup_config_dir();
    let state = load_state();
    state
        .library
        .add_record(DownloadRecord::new(1, "t", "Idle"))
        .unwrap();
    state
        .library
        .add_record(DownloadRecord::new(2, "t", "Done").with_state(DownloadState::Finish))
        .unwrap();

    assert_eq!(handle_command(Commands::StartAll, state.clone()).await, error::SUCCESS);
    assert_eq!(state.library.record(1).unwrap().state, DownloadState::Wait);
    assert_eq!(state.library.record(2).unwrap().state, DownloadState::Finish);

    assert_eq!(handle_command(Commands::StopAll, state.clone()).await, error::SUCCESS);
    assert_eq!(state.library.record(1).unwrap().state, DownloadState::None);

    let select = Commands::Select {
        which: SelectArg::Read,
        label: None,
    };
    assert_eq!(handle_command(select, state.clone()).await, error::SUCCESS);
    assert_eq!(
        handle_command(Commands::ResetProgress, state.clone()).await,
        error::SUCCESS
    );

    set_config_dir_override(None);
}
