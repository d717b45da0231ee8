use super::error;
use super::output;
use super::{BatchAction, Commands, LabelAction, SelectArg, SortArg};
use crate::app::state::AppState;
use crate::download::index::{DownloadIndex, IndexError};
use crate::download::label::LabelError;
use crate::ui::download_list::{DownloadListController, ToolbarAction};
use crate::ui::label_list::{LabelListController, SwipeResult};
use crate::ui::sort::SortKey;
use anyhow::Result;

/// Handle a CLI command and return exit code
pub async fn handle_command(command: Commands, state: AppState) -> i32 {
    let result = match command {
        Commands::Labels { action } => handle_labels(action, &state),
        Commands::List { label, sort, json } => handle_list(&state, label, sort, json).await,
        Commands::Batch {
            action,
            positions,
            label,
            to,
            remove_files,
        } => handle_batch(&state, action, positions, label, to, remove_files).await,
        Commands::StartAll => handle_toolbar(
            &state,
            ToolbarAction::StartAll,
            "Queued all idle downloads",
        ),
        Commands::StopAll => {
            handle_toolbar(&state, ToolbarAction::StopAll, "Stopped all downloads")
        }
        Commands::ResetProgress => handle_toolbar(
            &state,
            ToolbarAction::ResetReadingProgress,
            "Reading progress reset",
        ),
        Commands::Select { which, label } => handle_select(&state, which, label).await,
    };
    state.preferences.flush().await;

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(&e)
        }
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    if let Some(label_error) = e.downcast_ref::<LabelError>() {
        error::label_error_code(label_error)
    } else if let Some(index_error) = e.downcast_ref::<IndexError>() {
        error::index_error_code(index_error)
    } else {
        error::ERROR
    }
}

fn handle_labels(action: LabelAction, state: &AppState) -> Result<i32> {
    let mut controller = state.label_list();
    match action {
        LabelAction::List => {
            println!(
                "{}",
                output::format_labels(controller.labels(), &state.i18n.get("no-labels"))
            );
        }
        LabelAction::Add { name } => {
            controller.add_label(&name)?;
            println!("Added label: {}", name);
        }
        LabelAction::Rename { old, new } => {
            let position = position_of_label(&controller, &old)?;
            controller.rename_label(controller.item_id(position), &new)?;
            println!("Renamed label: {} -> {}", old, new);
        }
        LabelAction::Delete { name } => {
            let position = position_of_label(&controller, &name)?;
            controller.delete_label(controller.item_id(position))?;
            println!("Deleted label: {}", name);
        }
        LabelAction::Move { from, to } => {
            let len = controller.len();
            if from >= len || to >= len {
                eprintln!("Error: positions must be below {}", len);
                return Ok(error::INVALID_INPUT);
            }
            controller.move_label(from, to);
            println!(
                "{}",
                output::format_labels(controller.labels(), &state.i18n.get("no-labels"))
            );
        }
        LabelAction::Pin { name } => {
            let position = position_of_label(&controller, &name)?;
            controller.on_swipe(position, SwipeResult::Left);
            println!("{}", output::format_label_row(&controller.row(position)));
        }
    }
    controller.teardown();
    Ok(error::SUCCESS)
}

fn position_of_label(controller: &LabelListController, name: &str) -> Result<usize> {
    controller
        .labels()
        .iter()
        .position(|l| l.name == name)
        .ok_or_else(|| LabelError::NotFound(name.to_string()).into())
}

/// Download list showing `label`, or the default group
fn open_list(state: &AppState, label: Option<&str>) -> Result<DownloadListController> {
    if let Some(name) = label {
        if state.library.projection_for_label(name).is_none() {
            return Err(IndexError::UnknownLabel(name.to_string()).into());
        }
    }
    let mut controller = state.download_list(None);
    if controller.label() != label {
        controller.set_active_label(label);
    }
    Ok(controller)
}

async fn handle_list(
    state: &AppState,
    label: Option<String>,
    sort: Option<SortArg>,
    json: bool,
) -> Result<i32> {
    let mut controller = open_list(state, label.as_deref())?;
    if let Some(sort) = sort {
        controller.on_toolbar_action(ToolbarAction::Sort(sort_key(sort)))?;
    }

    // First pass queues the read-progress lookups
    for position in 0..controller.len() {
        controller.row(position);
    }
    controller.await_read_progress().await;
    let rows: Vec<_> = (0..controller.len()).map(|p| controller.row(p)).collect();

    println!("{}", output::format_download_rows(controller.title(), &rows, json));
    controller.teardown();
    Ok(error::SUCCESS)
}

fn sort_key(sort: SortArg) -> SortKey {
    match sort {
        SortArg::Pages => SortKey::Pages,
        SortArg::Title => SortKey::Title,
        SortArg::Author => SortKey::Author,
        SortArg::Category => SortKey::Category,
        SortArg::Shuffle => SortKey::Shuffle,
    }
}

async fn handle_batch(
    state: &AppState,
    action: BatchAction,
    mut positions: Vec<usize>,
    label: Option<String>,
    to: Option<String>,
    remove_files: bool,
) -> Result<i32> {
    let mut controller = open_list(state, label.as_deref())?;
    let len = controller.len();
    if let Some(bad) = positions.iter().find(|&&p| p >= len) {
        eprintln!("Error: position {} out of range for {} downloads", bad, len);
        return Ok(error::INVALID_INPUT);
    }
    positions.sort_unstable();
    positions.dedup();

    controller.enter_batch_mode();
    for &position in &positions {
        controller.toggle(position);
    }
    let count = positions.len();

    match action {
        BatchAction::Start => {
            controller.batch_start()?;
            println!("Queued {} downloads", count);
        }
        BatchAction::Stop => {
            controller.batch_stop()?;
            println!("Stopped {} downloads", count);
        }
        BatchAction::Delete => {
            let cleanup = controller.batch_delete(remove_files)?;
            println!("Deleted {} downloads", count);
            if let Some(cleanup) = cleanup {
                let removed = cleanup.await?;
                println!("Removed {} download directories", removed);
            }
        }
        BatchAction::Move => {
            controller.batch_move(to.as_deref())?;
            let target = to.unwrap_or_else(|| state.i18n.get("default-label-name"));
            println!("Moved {} downloads to {}", count, target);
        }
    }
    controller.teardown();
    Ok(error::SUCCESS)
}

fn handle_toolbar(state: &AppState, action: ToolbarAction, message: &str) -> Result<i32> {
    let mut controller = state.download_list(None);
    controller.on_toolbar_action(action)?;
    controller.teardown();
    println!("{}", message);
    Ok(error::SUCCESS)
}

async fn handle_select(state: &AppState, which: SelectArg, label: Option<String>) -> Result<i32> {
    let mut controller = open_list(state, label.as_deref())?;
    match which {
        SelectArg::All => controller.on_toolbar_action(ToolbarAction::SelectAll)?,
        SelectArg::Finished => controller.on_toolbar_action(ToolbarAction::SelectFinished)?,
        SelectArg::Read => {
            controller.on_toolbar_action(ToolbarAction::SelectRead)?;
            controller.await_read_progress().await;
        }
    }

    let selected = controller.selected_positions();
    if selected.is_empty() {
        println!("(none)");
    } else {
        let text: Vec<String> = selected.iter().map(usize::to_string).collect();
        println!("{}", text.join(","));
    }
    controller.teardown();
    Ok(error::SUCCESS)
}
