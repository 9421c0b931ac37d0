//! Transport plumbing
//!
//! The session loop consumes transport events and user actions, drives the
//! silence and reconnect timers, and hands commands back to whatever owns the
//! socket. `read_frames` and `write_commands` adapt any byte stream to it.

mod connection;

pub use self::connection::{Session, SessionHandle, SessionIo};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::core::{Direction, Error, Result};
use crate::protocol::{Command, MessageCodec};

/// Something the transport reported
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

/// Something the user did
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SelectDigit(usize),
    Nudge(Direction),
    SetMode(String),
    ToggleEngagement,
    Exit,
    RequestMeasurements,
}

/// Asks the transport owner to open a fresh connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectRequest {
    /// Connection attempt number, starting at 1 for the first connection
    pub attempt: u32,
}

/// Reads frames from `reader` and forwards them as transport events
///
/// Emits `Opened` first and `Closed` once the stream ends. Junk frames are
/// forwarded like any other; only a read failure is reported, as `Error`
/// followed by `Closed`.
pub async fn read_frames<R>(reader: R, events: mpsc::Sender<TransportEvent>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, MessageCodec::new());
    forward(&events, TransportEvent::Opened).await?;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(text) => forward(&events, TransportEvent::Message(text)).await?,
            Err(e) => {
                warn!(error = %e, "transport read failed");
                forward(&events, TransportEvent::Error(e.to_string())).await?;
                break;
            }
        }
    }

    debug!("transport stream ended");
    forward(&events, TransportEvent::Closed).await
}

/// Writes queued commands to `writer` until the queue closes
pub async fn write_commands<W>(writer: W, mut commands: mpsc::Receiver<Command>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, MessageCodec::new());
    while let Some(command) = commands.recv().await {
        debug!(command = command.name(), "sending command");
        sink.send(command).await?;
    }
    Ok(())
}

async fn forward(events: &mpsc::Sender<TransportEvent>, event: TransportEvent) -> Result<()> {
    events
        .send(event)
        .await
        .map_err(|e| Error::transport_lost(format!("Event receiver dropped: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, ConnectionState, MAX_FRAME_SIZE};
    use crate::model::{Mode, ModeCode};
    use crate::sync::{ObserverEvent, Status, SyncController};
    use tokio_test::io::Builder;

    async fn collect(mut rx: mpsc::Receiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_read_frames() {
        let reader = Builder::new()
            .read(b"{\"state\":{\"mode\":\"CC\"}}\n{\"meas")
            .read(b"urements\":{}}\n\n")
            .build();
        let (tx, rx) = mpsc::channel(8);

        read_frames(reader, tx).await.unwrap();
        assert_eq!(
            collect(rx).await,
            vec![
                TransportEvent::Opened,
                TransportEvent::Message("{\"state\":{\"mode\":\"CC\"}}".into()),
                TransportEvent::Message("{\"measurements\":{}}".into()),
                TransportEvent::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn test_junk_frames_keep_stream_open() {
        let reader = Builder::new()
            .read(b"\xff\xfe\n{\"state\":{\"mode\":\"CC\",\"value\":1.0}}\n")
            .build();
        let (tx, rx) = mpsc::channel(8);

        read_frames(reader, tx).await.unwrap();
        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                TransportEvent::Opened,
                TransportEvent::Message("\u{FFFD}\u{FFFD}".into()),
                TransportEvent::Message("{\"state\":{\"mode\":\"CC\",\"value\":1.0}}".into()),
                TransportEvent::Closed,
            ]
        );

        // the junk frame is a message error, not a connection loss
        let (commands, _rx) = mpsc::channel(8);
        let mut controller = SyncController::new(Config::default(), commands, Vec::<ObserverEvent>::new());
        controller.on_open();
        for event in &events[1..3] {
            if let TransportEvent::Message(text) = event {
                controller.handle_text(text);
            }
        }
        assert_eq!(controller.connection_state(), ConnectionState::Live);
        assert_eq!(controller.model().mode(), Mode::Active(ModeCode::CC));
        assert_eq!(controller.model().to_value(), 1.0);
        assert!(controller
            .observer()
            .iter()
            .any(|e| matches!(e, ObserverEvent::Status(Status::MessageError(_)))));
    }

    #[tokio::test]
    async fn test_oversized_frame_keeps_stream_open() {
        let mut payload = vec![b'x'; MAX_FRAME_SIZE + 100];
        payload.extend_from_slice(b"\n{}\n");
        let reader = Builder::new().read(&payload).build();
        let (tx, rx) = mpsc::channel(8);

        read_frames(reader, tx).await.unwrap();
        let events = collect(rx).await;
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[1], TransportEvent::Message(text) if text.len() == MAX_FRAME_SIZE));
        assert_eq!(events[2], TransportEvent::Message("{}".into()));
        assert_eq!(events[3], TransportEvent::Closed);
    }

    #[tokio::test]
    async fn test_read_error_closes() {
        let reader = Builder::new()
            .read(b"{}\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (tx, rx) = mpsc::channel(8);

        read_frames(reader, tx).await.unwrap();
        let events = collect(rx).await;
        assert_eq!(events.len(), 4);
        assert_eq!(events[1], TransportEvent::Message("{}".into()));
        assert!(matches!(events[2], TransportEvent::Error(_)));
        assert_eq!(events[3], TransportEvent::Closed);
    }

    #[tokio::test]
    async fn test_read_without_receiver() {
        let reader = Builder::new().build();
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        assert!(matches!(read_frames(reader, tx).await, Err(Error::TransportLost(_))));
    }

    #[tokio::test]
    async fn test_write_commands() {
        let writer = Builder::new()
            .write(b"{\"command\":\"setMode\",\"value\":\"CV\"}\n")
            .write(b"{\"command\":\"exit\",\"value\":null}\n")
            .build();
        let (tx, rx) = mpsc::channel(8);
        tx.send(Command::SetMode(ModeCode::CV)).await.unwrap();
        tx.send(Command::Exit).await.unwrap();
        drop(tx);

        write_commands(writer, rx).await.unwrap();
    }
}
