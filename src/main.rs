use std::io::{stdin, stdout};

use research_matcher::host::{self, HostState};
use research_matcher::{config, logging, native_messaging};

fn main() {
    if let Err(e) = real_main() {
        // Keep stderr noisy for bug reports; logs also go to file.
        eprintln!("[Research Matcher] fatal error: {e:?}");
        log::error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

fn real_main() -> anyhow::Result<()> {
    let _logger = logging::init_logging()?;

    log::info!("=== Research Matcher Host Started (v{}) ===", config::HOST_VERSION);
    log::info!("Waiting for requests on stdin...");

    let mut state = HostState::new();
    let mut in_stream = stdin();
    let mut out_stream = stdout();

    let mut message_count: u64 = 0;
    loop {
        let req = match native_messaging::read_message(&mut in_stream) {
            Ok(Some(r)) => r,
            Ok(None) => {
                log::info!("No more messages after {} messages, exiting", message_count);
                break;
            }
            Err(e) => {
                log::error!("Error reading message: {:?}", e);
                break;
            }
        };

        message_count += 1;
        log::info!("Processing message #{}: {} (id: {})", message_count, req.method, req.id);

        let resp = match host::handle_request(&mut state, &req.method, &req.id, &req.params) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Handler error: {:?}", e);
                host::error_response(&req.id, &e)
            }
        };
        if let Err(e) = native_messaging::write_json(&mut out_stream, &resp) {
            log::error!("Error sending response: {:?}", e);
            break;
        }
    }

    log::info!("=== Research Matcher Host Stopped ===");
    Ok(())
}
