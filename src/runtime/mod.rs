use std::env;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use allegro::backend::memory::MemoryBackend;
use allegro::player::PlayerService;
use allegro::session::RequestContext;

use playlist::Playlist;

mod logging;
mod playlist;
mod settings;

/// Dry-run a playlist import against the in-memory backend and print the result.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    logging::init_tracing(&settings.logging.filter);

    let path = env::args()
        .nth(1)
        .ok_or("usage: allegro <playlist.toml>")?;
    let playlist = Playlist::load(Path::new(&path))?;

    let backend = Arc::new(MemoryBackend::new().with_tracks(playlist.loadable()));
    let service = PlayerService::new(backend.clone(), &settings);

    let ctx = RequestContext {
        guild: playlist.guild,
        user_id: 0,
        user_name: playlist.requested_by.clone(),
        voice_channel: Some(playlist.voice_channel),
        text_channel: playlist.text_channel,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping import");
            on_interrupt.cancel();
        }
    });

    info!(guild = ctx.guild, tracks = playlist.tracks.len(), "Dry run");
    let report = service
        .enqueue(&ctx, &playlist.descriptors(), &cancel)
        .await?;

    println!("{report}");
    for title in &report.dropped {
        println!("  dropped: {title}");
    }
    if report.cancelled {
        println!("  (import cancelled)");
    }
    if report.session_closed {
        println!("  (player disconnected during import)");
    }

    let info = service.now_playing(&ctx).await?;
    if let Some(current) = &info.current {
        println!("Now playing: {}", current.display());
    }
    if let Some(view) = backend.snapshot(ctx.guild) {
        for (i, title) in view.queued.iter().enumerate() {
            println!("{:>3}. {title}", i + 1);
        }
    }
    Ok(())
}
