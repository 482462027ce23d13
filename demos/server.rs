// ABOUTME: Example SMGP gateway accepting clients with one shared secret
// ABOUTME: Logs submitted messages and echoes each one back to the client as a Deliver

use argh::FromArgs;
use smgp::auth;
use smgp::codec::Header;
use smgp::datatypes::{Deliver, DeliverResp, Login, LoginResp, Submit, SubmitResp};
use smgp::server::{ServerConfig, ServerHandler, SmgpServer};
use std::error::Error;
use tokio::sync::mpsc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Minimal SMGP gateway for trying out clients
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debug logging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the address to listen on (default: 127.0.0.1)
    #[argh(option)]
    host: Option<String>,

    /// the port to listen on (default: 7890)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the secret every client must log in with
    #[argh(option)]
    secret: String,

    /// echo every submitted message back as a Deliver
    #[argh(switch)]
    echo: bool,
}

struct EchoGateway {
    secret: String,
    echo: Option<mpsc::UnboundedSender<Deliver>>,
}

impl ServerHandler for EchoGateway {
    fn on_login(&self, _: &Header, login: &Login) -> LoginResp {
        info!(client_id = %login.client_id, "login");
        auth::answer_login(login, &self.secret, 0x30)
    }

    fn on_submit(&self, header: &Header, submit: &Submit) -> SubmitResp {
        let text = submit.text();
        info!(
            sequence_id = header.sequence_id,
            to = %submit.dest_term_id,
            from = %submit.src_term_id,
            text = %text.text,
            "submit"
        );
        if let Some(echo) = &self.echo {
            let _ = echo.send(Deliver::text(
                "",
                submit.dest_term_id.as_str(),
                submit.src_term_id.as_str(),
                text.text,
            ));
        }
        SubmitResp::new("", 0)
    }

    fn on_deliver_resp(&self, header: &Header, resp: &DeliverResp) {
        info!(sequence_id = header.sequence_id, status = resp.status, "deliver acknowledged");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ServerConfig::new(
        cli_args.host.unwrap_or_else(|| "127.0.0.1".to_owned()),
        cli_args.port.unwrap_or(7890),
    );

    let (echo_tx, mut echoes) = mpsc::unbounded_channel();
    let gateway = EchoGateway {
        secret: cli_args.secret,
        echo: cli_args.echo.then_some(echo_tx),
    };
    let server = SmgpServer::new(config, gateway).start().await?;
    info!(addr = %server.local_addr(), "gateway ready");

    loop {
        tokio::select! {
            Some(deliver) = echoes.recv() => {
                if let Err(err) = server.deliver(deliver).await {
                    info!(error = %err, "echo not delivered");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    server.shutdown().await;
    Ok(())
}
