//! # Example: plugin_lifecycle
//!
//! Demonstrates a plugin's full life on the runtime.
//!
//! Shows how to:
//! - Register a [`Listener`] that filters chat and overrules logins
//! - Schedule a repeating synchronous task and an asynchronous one-shot task
//! - Drive the heartbeat with the built-in ticker
//! - Watch faults and lifecycle reports on the diagnostics bus
//! - Unload the plugin, releasing its listeners and tasks in one call
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► ServerContext::builder(cfg).build()
//!   ├─► events.register(plugin, ChatGuard)
//!   ├─► scheduler: "announce" every 10 ticks, "warm-cache" async after 5 ticks
//!   ├─► spawn_ticker(token)
//!   ├─► host fires Chat / Login occurrences
//!   ├─► sleep (ticker runs ~30 heartbeats)
//!   ├─► unload_plugin(plugin)
//!   └─► stop_ticker()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example plugin_lifecycle --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tickvisor::{
    Cancellable, Capability, Config, DispatchOrder, Event, HandlerError, HandlerSet, Listener,
    LoginResult, LoginResultEvent, PluginContainer, RunFn, ServerContext, TaskError,
};
use tokio_util::sync::CancellationToken;

struct Chat {
    player: String,
    message: String,
    cancelled: bool,
}

impl Cancellable for Chat {
    fn cancelled(&self) -> bool {
        self.cancelled
    }
    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

impl Event for Chat {
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        Some(self)
    }
    fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> {
        Some(self)
    }
}

struct Login {
    player: String,
    result: LoginResult,
}

impl LoginResultEvent for Login {
    fn login_result(&self) -> LoginResult {
        self.result
    }
    fn set_login_result(&mut self, result: LoginResult) {
        self.result = result;
    }
}

impl Event for Login {
    fn as_login_result(&self) -> Option<&dyn LoginResultEvent> {
        Some(self)
    }
    fn as_login_result_mut(&mut self) -> Option<&mut dyn LoginResultEvent> {
        Some(self)
    }
}

/// Blocks spam, kicks banned players, and logs everything that got cancelled.
struct ChatGuard {
    banned: Vec<String>,
    blocked: AtomicU32,
}

impl Listener for ChatGuard {
    fn name(&self) -> &str {
        "chat-guard"
    }

    fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
        let me = Arc::clone(&self);
        set.on::<Chat, _>(DispatchOrder::LOWEST, false, move |chat| {
            if chat.message.contains("spam") {
                me.blocked.fetch_add(1, Ordering::Relaxed);
                chat.cancel();
            }
            Ok(())
        });

        set.on::<Login, _>(DispatchOrder::MIDDLE, false, move |login| {
            if self.banned.iter().any(|b| b == &login.player) {
                login.set_login_result(LoginResult::Kick);
            }
            Ok(())
        });

        // Monitors run last and still see cancelled occurrences.
        set.on_capability(
            Capability::Cancellable,
            DispatchOrder::HIGHEST,
            true,
            |ev| {
                if ev.is_cancelled() {
                    println!("[monitor] {} was cancelled", ev.name());
                }
                Ok(())
            },
        );

        // A buggy handler: the bus reports it and keeps going.
        set.on::<Chat, _>(DispatchOrder::HIGH, false, |chat| {
            if chat.player.is_empty() {
                return Err(HandlerError::fail("chat without a player"));
            }
            Ok(())
        });
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "logging")]
    tickvisor::init_logging("tickvisor=debug");

    println!("=== plugin_lifecycle example ===\n");

    // 1. Configure runtime (20 ticks per second)
    let cfg = Config::from_toml_str("tick_rate_ms = 50\ndiagnostics_capacity = 256")?;
    let ctx = ServerContext::builder(cfg).build();

    // 2. Print every diagnostic report
    let mut reports = ctx.diagnostics().subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(report) = reports.recv().await {
            println!(
                "[diag] {:<22} source={:<24} reason={}",
                report.kind.as_label(),
                report.source.as_deref().unwrap_or("-"),
                report.reason.as_deref().unwrap_or("-"),
            );
        }
    });

    // 3. Load the plugin
    let plugin = PluginContainer::new("guard-plugin");
    let guard = Arc::new(ChatGuard {
        banned: vec!["griefer".into()],
        blocked: AtomicU32::new(0),
    });
    ctx.events().register(&plugin, Arc::clone(&guard))?;

    let announcements = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&announcements);
    ctx.scheduler()
        .new_builder()
        .owner(&plugin)
        .interval(10)
        .execute(RunFn::arc("announce", move |task| {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            println!("[announce] #{n} (due tick {})", task.next_due());
            Ok::<_, TaskError>(())
        }))?;

    ctx.scheduler()
        .new_builder()
        .owner(&plugin)
        .delay(5)
        .asynchronous()
        .execute(RunFn::arc("warm-cache", |_task| {
            std::thread::sleep(Duration::from_millis(120));
            println!("[warm-cache] done on {:?}", std::thread::current().name());
            Ok::<_, TaskError>(())
        }))?;

    // 4. Start the heartbeat
    let token = CancellationToken::new();
    ctx.spawn_ticker(token.clone())?;

    // 5. Host fires occurrences
    for (player, message) in [("alex", "hello"), ("sam", "cheap spam here"), ("", "ghost")] {
        let mut chat = Chat {
            player: player.into(),
            message: message.into(),
            cancelled: false,
        };
        let cancelled = ctx.events().call(&mut chat);
        println!("[host] chat {message:?} delivered={}", !cancelled);
    }
    for player in ["alex", "griefer"] {
        let mut login = Login {
            player: player.into(),
            result: LoginResult::Success,
        };
        ctx.events().call(&mut login);
        println!("[host] login {player} -> {:?}", login.result);
    }

    // 6. Let the ticker run for a while
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // 7. Unload the plugin: listeners and tasks go away together
    let released = ctx.unload_plugin(&plugin);
    println!(
        "[host] unloaded: handlers={} tasks={} blocked={} announcements={}",
        released.handlers,
        released.tasks,
        guard.blocked.load(Ordering::Relaxed),
        announcements.load(Ordering::Relaxed),
    );

    // 8. Stop the heartbeat
    let driven = ctx.stop_ticker().await.unwrap_or(0);
    println!("[host] ticker stopped after {driven} heartbeats");

    // Give the printer a moment to drain the last reports.
    drop(ctx);
    let _ = tokio::time::timeout(Duration::from_millis(100), printer).await;
    Ok(())
}
