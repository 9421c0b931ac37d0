use eload_link::core::{ConnectionState, Direction, EngagementState};
use eload_link::model::Mode;
use eload_link::network::{read_frames, write_commands};
use eload_link::protocol::MeasurementsSnapshot;
use eload_link::util::init_tracing;
use eload_link::{Config, Observer, Session, Status, TransportEvent, UserAction};
use std::time::Duration;
use tokio::time::sleep;

/// Prints every change the session reports
struct Printer;

impl Observer for Printer {
    fn on_model_changed(&mut self, digits: &[u8], selected: Option<usize>, mode: Mode) {
        let rendered: String = digits
            .iter()
            .enumerate()
            .map(|(i, d)| {
                if Some(i) == selected {
                    format!("[{}]", d)
                } else {
                    d.to_string()
                }
            })
            .collect();
        println!("setpoint  {:<5} {}", mode, rendered);
    }

    fn on_engagement_changed(&mut self, engagement: EngagementState) {
        println!("output    {}", if engagement.is_engaged() { "ON" } else { "OFF" });
    }

    fn on_connection_state_changed(&mut self, state: ConnectionState) {
        println!("link      {}", state);
    }

    fn on_measurements(&mut self, snapshot: &MeasurementsSnapshot) {
        let d = &snapshot.display;
        println!(
            "readings  {} | {} | {} | {} | {}",
            d.voltage, d.current, d.power, d.resistance, d.temperature
        );
    }

    fn on_status(&mut self, status: &Status) {
        println!("status    {:?}", status);
    }
}

#[tokio::main]
async fn main() -> eload_link::Result<()> {
    init_tracing("eload_link=info")?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/demos/session.jsonl").to_string());
    println!("Replaying {}", path);

    let config = Config::default();
    let (session, handle, io) = Session::new(config, Printer)?;
    let session = tokio::spawn(session.run());

    // Commands go to stdout in wire form
    let writer = tokio::spawn(write_commands(tokio::io::stdout(), io.commands));

    let file = tokio::fs::File::open(&path).await?;
    read_frames(file, handle.events()).await?;

    // The recording ends with a close; come back on the first reconnect request
    let mut reconnects = io.reconnects;
    if let Some(request) = reconnects.recv().await {
        println!("reconnect attempt {}", request.attempt);
        handle.send_event(TransportEvent::Opened).await?;
    }

    // Edit the setpoint the way a user at the front panel would
    for action in [
        UserAction::SetMode("CC".into()),
        UserAction::SelectDigit(1),
        UserAction::Nudge(Direction::Up),
        UserAction::Nudge(Direction::Up),
        UserAction::ToggleEngagement,
        UserAction::RequestMeasurements,
        UserAction::Exit,
    ] {
        handle.send_action(action).await?;
        sleep(Duration::from_millis(50)).await;
    }

    drop(handle);
    let controller = match session.await {
        Ok(result) => result?,
        Err(e) => {
            eprintln!("Session task failed: {}", e);
            return Ok(());
        }
    };
    drop(controller);
    if let Ok(result) = writer.await {
        result?;
    }

    Ok(())
}
