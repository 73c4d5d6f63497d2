//! Stop triggers
//!
//! A run ends when the user types `q`, presses Ctrl-C, or the optional
//! run timer fires. Whichever comes first flips the shared stop flag; the
//! others then have nothing left to do.

use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use chatterbox_core::shutdown::ShutdownSignal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Key that stops the run
pub const QUIT_KEY: u8 = b'q';

/// Why the stdin listener returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// The quit key was read and a stop was requested
    Quit,
    /// Input ended before the quit key appeared
    Closed,
    /// Another trigger stopped the run first
    AlreadyStopped,
}

/// Read `reader` byte by byte until the quit key shows up
pub fn listen_for_quit<R: Read>(reader: R, shutdown: &ShutdownSignal) -> ListenerExit {
    for byte in reader.bytes() {
        if shutdown.is_stop_requested() {
            return ListenerExit::AlreadyStopped;
        }
        match byte {
            Ok(QUIT_KEY) => {
                info!("⌨️ Quit key received");
                shutdown.request_stop();
                return ListenerExit::Quit;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("⚠️ Can't read standard input: {}", e);
                return ListenerExit::Closed;
            }
        }
    }
    debug!("Standard input closed; use Ctrl-C to stop");
    ListenerExit::Closed
}

/// Watch `input` (stdin in the binary) on a dedicated thread.
///
/// A blocking read cannot be cancelled, so the thread is detached and simply
/// dies with the process.
pub fn spawn_input_listener<R>(
    input: R,
    shutdown: ShutdownSignal,
) -> io::Result<thread::JoinHandle<ListenerExit>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("stop-listener".to_string())
        .spawn(move || listen_for_quit(input, &shutdown))
}

/// Every stop trigger of a run, armed together before the run starts
#[derive(Debug)]
pub struct Triggers {
    ctrl_c: JoinHandle<()>,
    timer: Option<JoinHandle<()>>,
}

impl Triggers {
    /// Start the input listener, the Ctrl-C listener and the optional timer
    pub fn arm<R>(
        input: R,
        shutdown: &ShutdownSignal,
        run_for: Option<Duration>,
    ) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        spawn_input_listener(input, shutdown.clone())?;
        Ok(Self {
            ctrl_c: spawn_ctrl_c_listener(shutdown.clone()),
            timer: run_for.map(|duration| spawn_run_timer(duration, shutdown.clone())),
        })
    }

    /// Cancel the async triggers once the run is over
    pub fn disarm(self) {
        self.ctrl_c.abort();
        if let Some(timer) = self.timer {
            timer.abort();
        }
    }
}

/// Request a stop on Ctrl-C
pub fn spawn_ctrl_c_listener(shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("🛑 Ctrl-C received");
                    shutdown.request_stop();
                }
                Err(e) => warn!("⚠️ Can't listen for Ctrl-C: {}", e),
            },
            _ = shutdown.stopped() => {}
        }
    })
}

/// Request a stop once `duration` has passed
pub fn spawn_run_timer(duration: Duration, shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                info!("⏰ Run time of {:?} elapsed", duration);
                shutdown.request_stop();
            }
            _ = shutdown.stopped() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_key_stops_the_run() {
        let shutdown = ShutdownSignal::new();
        let exit = listen_for_quit(&b"abc\nxyq and more"[..], &shutdown);
        assert_eq!(exit, ListenerExit::Quit);
        assert!(shutdown.is_stop_requested());
    }

    #[test]
    fn test_eof_does_not_stop_the_run() {
        let shutdown = ShutdownSignal::new();
        let exit = listen_for_quit(&b"Q\nQuit\n"[..], &shutdown);
        assert_eq!(exit, ListenerExit::Closed);
        assert!(!shutdown.is_stop_requested());

        let exit = listen_for_quit(io::empty(), &shutdown);
        assert_eq!(exit, ListenerExit::Closed);
    }

    #[test]
    fn test_listener_yields_to_an_earlier_stop() {
        let shutdown = ShutdownSignal::new();
        shutdown.request_stop();
        let exit = listen_for_quit(&b"q"[..], &shutdown);
        assert_eq!(exit, ListenerExit::AlreadyStopped);
    }

    #[tokio::test]
    async fn test_input_listener_runs_on_its_own_thread() {
        let shutdown = ShutdownSignal::new();
        let listener = spawn_input_listener(&b"hello q"[..], shutdown.clone()).unwrap();
        assert_eq!(listener.join().unwrap(), ListenerExit::Quit);
        tokio::time::timeout(Duration::from_secs(1), shutdown.stopped())
            .await
            .expect("stop observed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_timer_stops_the_run() {
        let shutdown = ShutdownSignal::new();
        let triggers = Triggers::arm(io::empty(), &shutdown, Some(Duration::from_secs(5))).unwrap();

        tokio::time::timeout(Duration::from_secs(6), shutdown.stopped())
            .await
            .expect("timer fired");
        triggers.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timer_requests_stop() {
        let shutdown = ShutdownSignal::new();
        let timer = spawn_run_timer(Duration::from_secs(30), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!shutdown.is_stop_requested());

        timer.await.unwrap();
        assert!(shutdown.is_stop_requested());
    }

    #[tokio::test]
    async fn test_run_timer_exits_on_earlier_stop() {
        let shutdown = ShutdownSignal::new();
        let timer = spawn_run_timer(Duration::from_secs(3600), shutdown.clone());
        shutdown.request_stop();
        tokio::time::timeout(Duration::from_secs(1), timer)
            .await
            .expect("timer task ends")
            .unwrap();
    }
}
