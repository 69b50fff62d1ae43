use ochain::manpage::Manpage;
use ochain::Chain;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn main() -> Result<()> {
    // RUST_LOG=ochain=trace shows every wait and handoff.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Print the page. Seven threads race, the page still reads top to bottom.
    Manpage::stdout().print()?;

    // One worker per cpu, each taking an uneven amount of time on its turn.
    let cpus = num_cpus::get();
    let done = AtomicUsize::new(0);
    Chain::new(cpus).name("cpu").run(|worker| {
        thread::sleep(Duration::from_millis(fastrand::u64(0..50)));
        done.fetch_add(1, Ordering::Relaxed);
        println!("worker {} of {} finished its turn", worker.position, worker.len);
    })?;
    assert_eq!(done.into_inner(), cpus);

    Ok(())
}
