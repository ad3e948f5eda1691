use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use typedq::{
    config::{DEFAULT_CAPACITY, DEFAULT_RECEIVE_CAPACITY, DEFAULT_SOCKET_PATH},
    error::QueueError,
    message_types, MessageQueue, QueueClient, QueueConfig, QueueDevice, QueueServer, Result,
};
use std::{
    io::{self, BufRead, Write},
    process::Command,
    sync::Arc,
};

fn main() {
    env_logger::init();

    let socket_arg = Arg::with_name("socket")
        .short("s")
        .long("socket")
        .value_name("PATH")
        .help("Endpoint socket path")
        .default_value(DEFAULT_SOCKET_PATH)
        .takes_value(true)
        .global(true);

    let matches = App::new("typedq-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bounded typed message queue tool")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(socket_arg)
        .subcommand(
            SubCommand::with_name("serve")
                .about("Host a queue endpoint until killed")
                .arg(
                    Arg::with_name("capacity")
                        .short("c")
                        .long("capacity")
                        .value_name("BYTES")
                        .help("Initial queue capacity")
                        .default_value("0")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("resize")
                .about("Replace the queue storage; buffered messages are lost")
                .arg(
                    Arg::with_name("size")
                        .value_name("SIZE")
                        .help("New capacity in bytes")
                        .index(1),
                ),
        )
        .subcommand(SubCommand::with_name("fill").about("Push each stdin line as a LOG message"))
        .subcommand(SubCommand::with_name("submit").about("Push each stdin line as a numbered JOB message"))
        .subcommand(SubCommand::with_name("read").about("Print LOG messages as they arrive"))
        .subcommand(SubCommand::with_name("work").about("Execute JOB messages as they arrive"))
        .subcommand(SubCommand::with_name("stats").about("Print queue statistics"))
        .get_matches();

    if let Err(e) = run(&matches) {
        eprintln!("typedq-cli: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    // Global args are propagated into the subcommand's matches
    let socket = match matches.subcommand() {
        (_, Some(m)) => m.value_of("socket"),
        _ => matches.value_of("socket"),
    }
    .unwrap_or(DEFAULT_SOCKET_PATH);

    match matches.subcommand() {
        ("serve", Some(m)) => serve(socket, parse_u32(m.value_of("capacity"), "capacity", 0)?),
        ("resize", Some(m)) => {
            let size = parse_u32(m.value_of("size"), "size", DEFAULT_CAPACITY)?;
            QueueClient::connect(socket)?.set_capacity(size)?;
            println!("Queue resized to {} bytes", size);
            Ok(())
        }
        ("fill", Some(_)) => fill(&mut QueueClient::connect(socket)?),
        ("submit", Some(_)) => submit(&mut QueueClient::connect(socket)?),
        ("read", Some(_)) => read(&mut QueueClient::connect(socket)?),
        ("work", Some(_)) => work(&mut QueueClient::connect(socket)?),
        ("stats", Some(_)) => {
            print!("{}", QueueClient::connect(socket)?.stats()?);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn parse_u32(value: Option<&str>, parameter: &str, default: u32) -> Result<u32> {
    match value {
        Some(v) => v
            .parse()
            .map_err(|_| QueueError::invalid_parameter(parameter, format!("'{}' is not a byte count", v))),
        None => Ok(default),
    }
}

fn serve(socket: &str, capacity: u32) -> Result<()> {
    let queue = MessageQueue::new(QueueConfig::default().with_initial_capacity(capacity))?;
    let device = Arc::new(QueueDevice::new(Arc::new(queue)));
    let mut server = QueueServer::bind(socket, device)?;

    println!("Serving queue on {} ({} bytes)", server.path().display(), capacity);
    server.wait();
    server.shutdown()
}

fn fill(client: &mut QueueClient) -> Result<()> {
    for line in stdin_lines() {
        client.push(message_types::LOG, line?.as_bytes())?;
    }
    Ok(())
}

fn submit(client: &mut QueueClient) -> Result<()> {
    println!("Enter jobs (Ctrl+D to stop):");
    for (job_id, line) in (1u64..).zip(stdin_lines()) {
        let job = format!("{}:{}", job_id, line?);
        client.push(message_types::JOB, job.as_bytes())?;
    }
    Ok(())
}

fn read(client: &mut QueueClient) -> Result<()> {
    let stdout = io::stdout();
    loop {
        let message = client.pop(DEFAULT_RECEIVE_CAPACITY)?;
        if message.msg_type == message_types::LOG {
            let mut out = stdout.lock();
            out.write_all(&message.payload)?;
            out.flush()?;
        }
    }
}

fn work(client: &mut QueueClient) -> Result<()> {
    let pid = std::process::id();
    loop {
        let message = client.pop(DEFAULT_RECEIVE_CAPACITY)?;
        if message.msg_type != message_types::JOB {
            continue;
        }

        let text = message.payload_str();
        let Some((job_id, command)) = parse_job(&text) else {
            log::warn!("malformed job payload {:?}", text);
            continue;
        };

        println!("[Worker {}] Executing job {}: {}", pid, job_id, command);
        match Command::new("sh").arg("-c").arg(command).status() {
            Ok(status) if !status.success() => log::warn!("job {} exited with {}", job_id, status),
            Ok(_) => {}
            Err(e) => log::warn!("job {} failed to start: {}", job_id, e),
        }
    }
}

/// Split `id:command`, dropping the trailing newline
fn parse_job(text: &str) -> Option<(u64, &str)> {
    let (id, command) = text.split_once(':')?;
    let id = id.trim().parse().ok()?;
    Some((id, command.trim_end_matches(&['\r', '\n'][..])))
}

/// Stdin lines with their newline kept, as the payload format expects
fn stdin_lines() -> impl Iterator<Item = io::Result<String>> {
    let stdin = io::stdin();
    std::iter::from_fn(move || {
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(e) => Some(Err(e)),
        }
    })
}
