// ABOUTME: Example application sending one SMS through an SMGP gateway
// ABOUTME: Logs every client event and disconnects once the submit is answered or times out

use argh::FromArgs;
use smgp::client::{ClientConfig, ConnectionState, SmgpClient};
use smgp::datatypes::DeliverContent;
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Send a message through an SMGP gateway and wait for its Submit_Resp
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debug logging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the hostname or IP address of the gateway (default: 127.0.0.1)
    #[argh(option)]
    host: Option<String>,

    /// the port of the gateway (default: 7890)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the client id
    #[argh(option)]
    client_id: String,

    /// the shared secret
    #[argh(option)]
    secret: String,

    /// the service id placed in the Submit
    #[argh(option)]
    service_id: Option<String>,

    /// the access number messages are sent from
    #[argh(option, short = 'f')]
    from: String,

    /// extend code appended to the access number
    #[argh(option, short = 'e')]
    extend: Option<String>,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClientConfig::new(
        cli_args.host.unwrap_or_else(|| "127.0.0.1".to_owned()),
        cli_args.port.unwrap_or(7890),
        cli_args.client_id,
        cli_args.secret,
    )
    .service_id(cli_args.service_id.unwrap_or_default())
    .src_id(cli_args.from)
    .retry_interval(Duration::from_secs(10));

    let (done_tx, mut done) = mpsc::unbounded_channel();
    let mut client = SmgpClient::new(config);
    let on_submit = done_tx.clone();
    client
        .on_connect(|| info!("connected"))
        .on_submit(move |header, body| {
            info!(sequence_id = header.sequence_id, ?body, "submit answered");
            let _ = on_submit.send(());
        })
        .on_deliver(|_, deliver, ack| {
            match &deliver.content {
                DeliverContent::Text(text) => {
                    info!(from = %deliver.src_term_id, text = %text.text, "message received")
                }
                DeliverContent::Report(report) => {
                    info!(msg_id = %report.msg_id, txt = %report.txt, "status report")
                }
            }
            ack.ack();
        })
        .on_error(|err| warn!(error = %err, "client error"))
        .on_exit(|reason| info!(%reason, "session exited"))
        .on_timeout(move |destination, _| {
            warn!(%destination, "submit timed out");
            let _ = done_tx.send(());
        });

    let handle = client.start();
    handle.wait_for_state(ConnectionState::Ready).await?;

    let sequence_ids = handle
        .send_sms(&cli_args.to, &cli_args.message, cli_args.extend.as_deref())
        .await?;
    info!(?sequence_ids, "submitted");

    for _ in &sequence_ids {
        if done.recv().await.is_none() {
            break;
        }
    }

    handle.disconnect().await;
    Ok(())
}
