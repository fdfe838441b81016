//! Client runtime.
//!
//! Connects to a server, performs the login handshake, then drives a
//! [`Session`] from three sources on one task: server frames, user intents
//! and the session's gravity timer.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, warn};

use tetrinet_core::protocol::{login_frame, team_frame};
use tetrinet_core::{Presenter, ServerMessage, Session};
use tetrinet_types::Intent;

use crate::config::ClientConfig;
use crate::transport::{spawn_writer, write_frame, ChannelSink, FrameReader, TransportError};

/// Why [`run_session`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user asked to quit
    Quit,
    /// The server closed the connection
    Disconnected,
}

/// Result of a successful handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub player: u8,
    /// Frames that arrived before `playernum`, in order
    pub early_frames: Vec<String>,
}

/// Send the login blob and wait for our player number.
///
/// A `noconnecting` reply (nick taken, server full, ...) is an error.
pub async fn handshake<R, W>(
    reader: &mut FrameReader<R>,
    writer: &mut W,
    config: &ClientConfig,
) -> Result<Handshake, TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &login_frame(&config.nick)).await?;

    let handshake = time::timeout(config.handshake_timeout(), await_player_number(reader))
        .await
        .map_err(|_| TransportError::HandshakeTimeout(config.handshake_timeout_ms))??;

    write_frame(writer, &team_frame(handshake.player, &config.team)).await?;
    info!(player = handshake.player, nick = %config.nick, "logged in");
    Ok(handshake)
}

async fn await_player_number<R: AsyncRead + Unpin>(
    reader: &mut FrameReader<R>,
) -> Result<Handshake, TransportError> {
    let mut early_frames = Vec::new();
    loop {
        let Some(frame) = reader.next_frame().await? else {
            return Err(TransportError::Closed);
        };
        if let Some(reason) = frame.strip_prefix("noconnecting") {
            return Err(TransportError::Refused(reason.trim().to_string()));
        }
        match ServerMessage::parse(&frame) {
            Ok(ServerMessage::PlayerNum(player)) => {
                return Ok(Handshake {
                    player,
                    early_frames,
                })
            }
            _ => early_frames.push(frame),
        }
    }
}

/// Seed from config or the clock
pub fn session_seed(config: &ClientConfig) -> u32 {
    config.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
            .unwrap_or(1)
    })
}

/// Connect, log in and play until the user quits or the server hangs up
pub async fn run_client<P: Presenter>(
    config: ClientConfig,
    presenter: P,
    intents: mpsc::Receiver<Intent>,
) -> anyhow::Result<Exit> {
    let addr = config.server_addr();
    let socket = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connect {} failed", addr))?;
    socket.set_nodelay(true)?;
    info!(%addr, "connected");

    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = FrameReader::new(reader);
    let handshake = handshake(&mut reader, &mut writer, &config)
        .await
        .context("handshake failed")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = spawn_writer(writer, rx);

    let mut session = Session::new(
        handshake.player,
        &config.nick,
        session_seed(&config),
        ChannelSink::new(tx),
        presenter,
    );
    for frame in &handshake.early_frames {
        session.handle_frame(frame);
    }

    let exit = run_session(&mut session, &mut reader, intents).await;
    drop(session);
    let _ = writer_task.await;
    exit
}

/// Event loop for an established session
pub async fn run_session<R, P>(
    session: &mut Session<ChannelSink, P>,
    reader: &mut FrameReader<R>,
    mut intents: mpsc::Receiver<Intent>,
) -> anyhow::Result<Exit>
where
    R: AsyncRead + Unpin,
    P: Presenter,
{
    // (handle id, deadline) of the tick we are waiting on
    let mut armed: Option<(u64, Instant)> = None;
    let mut intents_open = true;
    session.flush_redraw();

    loop {
        armed = match (session.pending_tick(), armed) {
            (Some(handle), Some((id, deadline))) if handle.id == id => Some((id, deadline)),
            (Some(handle), _) => Some((
                handle.id,
                Instant::now() + Duration::from_millis(handle.interval_ms as u64),
            )),
            (None, _) => None,
        };
        let deadline = armed.map(|(_, d)| d);

        tokio::select! {
            frame = reader.next_frame() => {
                match frame {
                    Ok(Some(frame)) => session.handle_frame(&frame),
                    Ok(None) => {
                        info!("server closed the connection");
                        return Ok(Exit::Disconnected);
                    }
                    Err(err) => {
                        warn!(%err, "read failed");
                        return Err(err.into());
                    }
                }
            }
            intent = intents.recv(), if intents_open => {
                match intent {
                    Some(intent) => {
                        debug!(?intent, "intent");
                        if !session.apply_intent(intent) {
                            return Ok(Exit::Quit);
                        }
                    }
                    None => {
                        // Keep following the game without input.
                        intents_open = false;
                        debug!("intent source closed");
                    }
                }
            }
            _ = sleep_until(deadline), if deadline.is_some() => {
                if let Some(handle) = session.pending_tick() {
                    session.on_tick(handle);
                }
            }
        }

        session.flush_redraw();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
