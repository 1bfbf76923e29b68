use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cadence_core::domain::{MetricsSnapshot, OwnerId, TaskConfig, TaskKind};
use cadence_core::impls::heuristics::StaticMetricsSource;
use cadence_core::{AppBuilder, CadenceConfig};

const SCRIPT: &str = "Nobody could explain the lights over the lake. For thirty years the town kept \
quiet, until one fisherman started writing everything down. What he found in the water changed \
the story forever. Subscribe and comment with your own theory.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // RUST_LOG が無ければ info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) 設定: 引数があれば TOML を読む
    let config = match std::env::args().nth(1) {
        Some(path) => CadenceConfig::load_or_default(Path::new(&path)),
        None => CadenceConfig::default(),
    };
    let target = config.goal.target();
    let cadence = config.goal.cadence_per_week;

    let owner = OwnerId::new("demo-channel");
    let metrics = StaticMetricsSource::new().with(owner.clone(), MetricsSnapshot::new(320.0, 54_000.0));

    // (B) ヒューリスティック実装で組み立て
    let app = AppBuilder::new()
        .with_config(config)
        .with_metrics(Arc::new(metrics))
        .expect_kinds(&[TaskKind::ScriptToPublish, TaskKind::BatchGeneration])
        .build()
        .await?;

    // (C) ワーカー起動 → 購読 → 投入（購読は投入より先）
    let workers = app.start_workers();
    let mut events = app.subscribe();
    let task = app
        .submit_task(
            TaskKind::ScriptToPublish,
            TaskConfig::script("The Lights Over the Lake", "mystery", SCRIPT).with_auto_publish(true),
            owner.clone(),
        )
        .await?;
    println!("submitted: {} ({} steps)", task.id, task.steps.len());

    // (D) 終端状態までイベントを表示（Ctrl-C で中断）
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                if event.task_id != task.id {
                    continue;
                }
                let t = &event.snapshot;
                if let Some(step) = t.steps.get(t.current_step_index) {
                    println!(
                        "[{:>3}%] {:<18} {:>3}% {}",
                        t.overall_progress(),
                        step.name,
                        step.progress,
                        step.message
                    );
                }
                if t.status.is_terminal() {
                    println!("final status: {:?} error={:?}", t.status, t.error);
                    if let Some(result) = &t.result {
                        println!("result: {}", serde_json::to_string_pretty(result)?);
                    }
                    break;
                }
            }
        }
    }
    workers.shutdown_and_join().await;

    // (E) 進捗とカレンダー
    let progress = app.compute_progress(&owner, target).await?;
    println!("progress: {}", serde_json::to_string_pretty(&progress)?);

    let calendar = app.plan_calendar(&owner, target, cadence).await?;
    println!(
        "calendar: {} jobs planned ({} units needed), completion {}",
        calendar.jobs.len(),
        calendar.units_needed,
        calendar.estimated_completion
    );
    for job in calendar.jobs.iter().take(5) {
        println!(
            "  {} {:<9?} {} (impact {:.0})",
            job.scheduled_date, job.priority, job.topic.title, job.estimated_impact
        );
    }
    for milestone in &calendar.milestones {
        println!("  day {:>3}: {}", milestone.day, milestone.label);
    }
    for tip in &calendar.strategy {
        println!("  tip: {tip}");
    }

    // (F) スケジューラで 1 週間分を回す（ワーカーは止めてあるので同期実行）
    let today = app.clock().today();
    for day in 0..7 {
        let report = app.schedule_tick(today + Duration::days(day)).await;
        let ran = app.drain_queue().await;
        info!(day, submitted = report.submitted.len(), reconciled = report.reconciled, ran, "simulated day");
    }
    // 最終日の結果を反映させる
    app.schedule_tick(today + Duration::days(7)).await;

    let counts = app.status_counts(Some(&owner)).await?;
    println!("counts: {counts:?}");
    if let Some(calendar) = app.calendar(&owner).await {
        println!("units generated this week: {}", calendar.units_generated);
    }
    for upcoming in app.upcoming(3).await {
        println!("next: {} {}", upcoming.job.scheduled_date, upcoming.job.topic.title);
    }

    Ok(())
}
