use std::time::Duration;

use anyhow::{Context, Error};

use adc_codec::client::{Application, Event, HubDesc, HubUrl, Profile};

// Poor human's terminal color support.
const BLUE: &str = "\x1b[34m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .context("USAGE: tokio-client <adc://host:port>")?;
    let url: HubUrl = url.parse().context("Could not parse hub URL")?;

    let profile = Profile {
        nick: "adc-codec-demo".into(),
        share_size: 0,
    };

    let (mut app, mut events) = Application::new(Duration::from_secs(10));
    let hub = app.add_hub(HubDesc::from_url(&url, profile, true));

    while let Some(event) = events.recv().await {
        match event.event {
            Event::ConnectionMade => println!("[!] connected to {url}"),
            Event::ConnectionLost { reason } => {
                println!("[!] connection lost: {reason}");
            }
            Event::HubIdentified { info } => {
                println!(
                    "[!] hub identified: {} ({})",
                    info.nick().unwrap_or("?"),
                    info.version().unwrap_or("?"),
                );

                app.send_chat(hub, "hello from adc-codec");
            }
            Event::UserInfo { sid, info } => {
                println!("S: {BLUE}{sid} is {}{RESET}", info.nick().unwrap_or("?"));
            }
            Event::UserQuit { sid } => println!("S: {BLUE}{sid} quit{RESET}"),
            Event::Message { sid, text } => println!("S: {BLUE}<{sid}> {text}{RESET}"),
            Event::Status { status } => println!("S: {RED}{status}{RESET}"),
            Event::DirectConnect { from, to, frame } => {
                println!("S: {RED}{from} wants a connection to {to}: {frame}{RESET}");
            }
        }
    }

    Ok(())
}
