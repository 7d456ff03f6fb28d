//! Command interpreter for the simulated container CLI.
//!
//! Every call is a pure function of `(session, line, now)`: it returns the
//! reply to display and the next session, and never mutates its input.
//! Commands are recognized by an ordered rule table (first match wins) with a
//! fallback for anything unrecognized. Malformed arguments always produce a
//! usage message rather than an error.

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::core::resources::{Container, PortMapping, Resources};
use crate::core::types::{TASK_LOGS, TASK_PULL, TASK_RUN, TaskSignal, TaskState};

/// Image whose pull completes the `pull` task.
pub const BOOTSTRAP_IMAGE: &str = "nginx";
/// Container name of the canonical `run` solution.
pub const CANONICAL_NAME: &str = "web";
/// Port mapping of the canonical `run` solution, compared as typed.
pub const CANONICAL_PORTS: &str = "8080:80";
/// Marker printed as the last synthetic log line of every container.
pub const COMPLETION_MARKER: &str = "flag{docker-stage-1-ok}";

pub const BANNER: &[&str] = &[
    "Container Escape Room: Level 1 (Docker)",
    "Type 'help' for available commands.",
];

pub const HELP_TEXT: &[&str] = &[
    "Available commands:",
    "  help                Show this help",
    "  clear               Clear terminal",
    "  hint                Show a contextual hint",
    "  docker images       List pulled images",
    "  docker pull <img>   Pull an image (e.g. docker pull nginx)",
    "  docker run --name <name> -p <host:cont> <image>",
    "  docker ps           List running containers",
    "  docker logs <name>  Show container logs",
];

pub const HINTS: &[&str] = &[
    "Hint #1: start with docker pull nginx",
    "Hint #2: run a container: docker run --name web -p 8080:80 nginx",
    "Hint #3: now look at the logs: docker logs web",
];

const RUN_USAGE: &str = "Usage: docker run --name web -p 8080:80 nginx";
const LOGS_USAGE: &str = "Usage: docker logs <name>";
const PULL_USAGE: &str = "Error: missing image name. Try: docker pull nginx";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid container name regex"));

/// Session-scoped interpreter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub resources: Resources,
    hint_cursor: usize,
}

impl Session {
    /// Rebuild the resources implied by tasks already completed elsewhere.
    ///
    /// A completed `pull` implies the bootstrap image; a completed `run`
    /// implies the canonical container. Existing resources are kept.
    pub fn restore(&self, tasks: &TaskState, now: DateTime<Local>) -> Session {
        let mut next = self.clone();
        if tasks.is_done(TASK_PULL) || tasks.is_done(TASK_RUN) {
            next.resources.add_image(BOOTSTRAP_IMAGE);
        }
        if tasks.is_done(TASK_RUN) && next.resources.container(CANONICAL_NAME).is_none() {
            if let Some(ports) = PortMapping::parse(CANONICAL_PORTS) {
                next.resources.put_container(synthetic_container(
                    CANONICAL_NAME,
                    BOOTSTRAP_IMAGE,
                    ports,
                    now,
                ));
            }
        }
        next
    }
}

/// How the caller should treat previously displayed output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Append,
    Clear,
}

/// Output of one interpreted line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub screen: Screen,
    pub signals: Vec<TaskSignal>,
}

impl Reply {
    fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines([line.into()])
    }

    fn with_signal(mut self, task: &str) -> Self {
        self.signals.push(TaskSignal::done(task));
        self
    }
}

struct Input<'a> {
    line: &'a str,
    tokens: Vec<&'a str>,
    now: DateTime<Local>,
}

impl Input<'_> {
    /// Tokens after `<namespace> <command>`.
    fn args(&self) -> &[&str] {
        self.tokens.get(2..).unwrap_or_default()
    }
}

enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, line: &str) -> bool {
        match self {
            Pattern::Exact(expected) => line == *expected,
            Pattern::Prefix(prefix) => line.starts_with(prefix),
        }
    }
}

type Handler = fn(&Session, &Input<'_>) -> (Reply, Session);

struct Rule {
    pattern: Pattern,
    handler: Handler,
}

const RULES: &[Rule] = &[
    Rule {
        pattern: Pattern::Exact("help"),
        handler: help,
    },
    Rule {
        pattern: Pattern::Exact("clear"),
        handler: clear,
    },
    Rule {
        pattern: Pattern::Exact("hint"),
        handler: hint,
    },
    Rule {
        pattern: Pattern::Exact("docker images"),
        handler: images,
    },
    Rule {
        pattern: Pattern::Prefix("docker pull"),
        handler: pull,
    },
    Rule {
        pattern: Pattern::Exact("docker ps"),
        handler: ps,
    },
    Rule {
        pattern: Pattern::Prefix("docker run"),
        handler: run,
    },
    Rule {
        pattern: Pattern::Prefix("docker logs"),
        handler: logs,
    },
];

const FALLBACK: Handler = unrecognized;

/// Interpret one line of user input against `session`.
pub fn interpret(session: &Session, line: &str, now: DateTime<Local>) -> (Reply, Session) {
    let line = line.trim();
    if line.is_empty() {
        return (Reply::default(), session.clone());
    }

    let input = Input {
        line,
        tokens: line.split_whitespace().collect(),
        now,
    };
    let handler = RULES
        .iter()
        .find(|rule| rule.pattern.matches(line))
        .map_or(FALLBACK, |rule| rule.handler);
    handler(session, &input)
}

fn help(session: &Session, _input: &Input<'_>) -> (Reply, Session) {
    (Reply::lines(HELP_TEXT.iter().copied()), session.clone())
}

fn clear(session: &Session, _input: &Input<'_>) -> (Reply, Session) {
    let reply = Reply {
        screen: Screen::Clear,
        ..Reply::default()
    };
    (reply, session.clone())
}

fn hint(session: &Session, _input: &Input<'_>) -> (Reply, Session) {
    let last = HINTS.len() - 1;
    let shown = session.hint_cursor.min(last);
    let mut next = session.clone();
    next.hint_cursor = (shown + 1).min(last);
    (Reply::line(HINTS[shown]), next)
}

fn images(session: &Session, _input: &Input<'_>) -> (Reply, Session) {
    let rows: Vec<String> = session
        .resources
        .images()
        .map(|image| format!("{image}\tlatest"))
        .collect();
    let reply = if rows.is_empty() {
        Reply::lines(["REPOSITORY\tTAG", "<none>\t\t<none>"])
    } else {
        Reply::lines(rows)
    };
    (reply, session.clone())
}

fn pull(session: &Session, input: &Input<'_>) -> (Reply, Session) {
    let Some(image) = input.args().first() else {
        return (Reply::line(PULL_USAGE), session.clone());
    };

    let mut next = session.clone();
    next.resources.add_image(image);
    let mut reply = Reply::line(format!("Pulling {image}... done"));
    if *image == BOOTSTRAP_IMAGE {
        reply = reply.with_signal(TASK_PULL);
    }
    (reply, next)
}

fn ps(session: &Session, _input: &Input<'_>) -> (Reply, Session) {
    let rows: Vec<String> = session
        .resources
        .containers()
        .map(|container| {
            let id: String = container.name.chars().take(12).collect();
            format!("{id}   {}   {}", container.image, container.status())
        })
        .collect();
    let reply = if rows.is_empty() {
        Reply::lines(["CONTAINER ID   IMAGE   STATUS", "<none>"])
    } else {
        Reply::lines(rows)
    };
    (reply, session.clone())
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs<'a> {
    name: &'a str,
    ports: PortMapping,
    image: &'a str,
}

fn parse_run<'a>(args: &[&'a str]) -> Option<RunArgs<'a>> {
    let mut name = None;
    let mut ports = None;
    let mut positional = Vec::new();

    let mut iter = args.iter().copied();
    while let Some(token) = iter.next() {
        match token {
            "--name" => name = Some(iter.next()?),
            "-p" => ports = Some(iter.next()?),
            other => positional.push(other),
        }
    }

    let name = name.filter(|name| NAME_RE.is_match(name))?;
    let ports = PortMapping::parse(ports?)?;
    let image = *positional.last()?;
    Some(RunArgs { name, ports, image })
}

fn run(session: &Session, input: &Input<'_>) -> (Reply, Session) {
    let Some(args) = parse_run(input.args()) else {
        return (Reply::line(RUN_USAGE), session.clone());
    };
    if !session.resources.has_image(args.image) {
        let message = format!(
            "Unable to find image '{}'. Try: docker pull {}",
            args.image, args.image
        );
        return (Reply::line(message), session.clone());
    }

    let ports = args.ports.to_string();
    let mut reply = Reply::line(format!("Started container '{}' (ports {ports})", args.name));
    if args.name == CANONICAL_NAME && ports == CANONICAL_PORTS && args.image == BOOTSTRAP_IMAGE {
        reply = reply.with_signal(TASK_RUN);
    }

    let mut next = session.clone();
    next.resources.put_container(synthetic_container(
        args.name,
        args.image,
        args.ports,
        input.now,
    ));
    (reply, next)
}

fn logs(session: &Session, input: &Input<'_>) -> (Reply, Session) {
    let Some(name) = input.args().first() else {
        return (Reply::line(LOGS_USAGE), session.clone());
    };
    match session.resources.container(name) {
        Some(container) => {
            let reply = Reply::lines(container.logs.iter().cloned()).with_signal(TASK_LOGS);
            (reply, session.clone())
        }
        None => (
            Reply::line(format!("No such container: {name}")),
            session.clone(),
        ),
    }
}

fn unrecognized(session: &Session, input: &Input<'_>) -> (Reply, Session) {
    let reply = Reply::lines([
        format!("Command not found: {}", input.line),
        "Type 'help' for help.".to_string(),
    ]);
    (reply, session.clone())
}

fn synthetic_container(
    name: &str,
    image: &str,
    ports: PortMapping,
    now: DateTime<Local>,
) -> Container {
    let logs = vec![
        format!("[{}] Starting {name} from {image}", now.format("%H:%M:%S")),
        format!("App listening on 0.0.0.0:{}", ports.container),
        COMPLETION_MARKER.to_string(),
    ];
    Container {
        name: name.to_string(),
        image: image.to_string(),
        ports,
        running: true,
        logs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(session: &Session, line: &str) -> (Reply, Session) {
        interpret(session, line, Local::now())
    }

    fn exec_all(lines: &[&str]) -> (Reply, Session) {
        let mut session = Session::default();
        let mut reply = Reply::default();
        for line in lines {
            (reply, session) = exec(&session, line);
        }
        (reply, session)
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let session = Session::default();
        let (reply, next) = exec(&session, "   ");
        assert_eq!(reply, Reply::default());
        assert_eq!(next, session);
    }

    #[test]
    fn unknown_command_reports_not_found() {
        let (_, session) = exec_all(&["docker pull nginx"]);
        for line in ["ls -la", "docker", "Docker ps", "docker images -a", "HELP"] {
            let (reply, next) = exec(&session, line);
            assert_eq!(
                reply.lines,
                vec![
                    format!("Command not found: {line}"),
                    "Type 'help' for help.".to_string()
                ]
            );
            assert!(reply.signals.is_empty());
            assert_eq!(next, session);
        }
    }

    #[test]
    fn help_lists_commands() {
        let (reply, _) = exec_all(&["help"]);
        assert_eq!(reply.lines.first().map(String::as_str), Some("Available commands:"));
        assert_eq!(reply.lines.len(), HELP_TEXT.len());
    }

    #[test]
    fn clear_only_affects_display() {
        let (_, session) = exec_all(&["docker pull nginx"]);
        let (reply, next) = exec(&session, "clear");
        assert_eq!(reply.screen, Screen::Clear);
        assert!(reply.lines.is_empty());
        assert_eq!(next, session);
    }

    #[test]
    fn hints_advance_and_saturate() {
        let mut session = Session::default();
        let mut shown = Vec::new();
        for _ in 0..5 {
            let (reply, next) = exec(&session, "hint");
            shown.push(reply.lines[0].clone());
            session = next;
        }
        assert_eq!(shown[0], HINTS[0]);
        assert_eq!(shown[1], HINTS[1]);
        assert_eq!(shown[2], HINTS[2]);
        assert_eq!(shown[3], HINTS[2]);
        assert_eq!(shown[4], HINTS[2]);
    }

    #[test]
    fn images_sentinel_when_empty() {
        let (reply, _) = exec_all(&["docker images"]);
        assert_eq!(reply.lines, vec!["REPOSITORY\tTAG", "<none>\t\t<none>"]);
    }

    #[test]
    fn pull_registers_image_and_signals_only_for_bootstrap() {
        let (reply, session) = exec_all(&["docker pull redis"]);
        assert_eq!(reply.lines, vec!["Pulling redis... done"]);
        assert!(reply.signals.is_empty());
        assert!(session.resources.has_image("redis"));

        let (reply, session) = exec(&session, "docker pull nginx");
        assert_eq!(reply.signals, vec![TaskSignal::done(TASK_PULL)]);

        let (reply, _) = exec(&session, "docker images");
        assert_eq!(reply.lines, vec!["nginx\tlatest", "redis\tlatest"]);
    }

    #[test]
    fn pull_without_image_is_usage_error() {
        let session = Session::default();
        let (reply, next) = exec(&session, "docker pull");
        assert_eq!(reply.lines, vec![PULL_USAGE]);
        assert_eq!(next, session);
    }

    #[test]
    fn run_before_pull_is_rejected() {
        let session = Session::default();
        let (reply, next) = exec(&session, "docker run --name web -p 8080:80 nginx");
        assert_eq!(
            reply.lines,
            vec!["Unable to find image 'nginx'. Try: docker pull nginx"]
        );
        assert!(reply.signals.is_empty());
        assert_eq!(next, session);
        assert_eq!(next.resources.containers().count(), 0);
    }

    #[test]
    fn run_with_malformed_arguments_is_usage_error() {
        let (_, session) = exec_all(&["docker pull nginx"]);
        for line in [
            "docker run",
            "docker run nginx",
            "docker run --name web nginx",
            "docker run -p 8080:80 nginx",
            "docker run --name web -p 8080 nginx",
            "docker run --name web -p 8080:80",
            "docker run --name we!b -p 8080:80 nginx",
            "docker run --name web -p 80a:80 nginx",
            "docker run --name web -p",
        ] {
            let (reply, next) = exec(&session, line);
            assert_eq!(reply.lines, vec![RUN_USAGE], "line: {line}");
            assert_eq!(next, session, "line: {line}");
        }
    }

    #[test]
    fn canonical_run_creates_container_and_signals() {
        let (reply, session) = exec_all(&[
            "docker pull nginx",
            "docker run --name web -p 8080:80 nginx",
        ]);
        assert_eq!(reply.lines, vec!["Started container 'web' (ports 8080:80)"]);
        assert_eq!(reply.signals, vec![TaskSignal::done(TASK_RUN)]);

        let (reply, _) = exec(&session, "docker ps");
        assert_eq!(reply.lines, vec!["web   nginx   Up"]);
    }

    #[test]
    fn non_canonical_run_creates_container_without_signal() {
        let (reply, session) = exec_all(&[
            "docker pull nginx",
            "docker run --name api -p 9000:90 nginx",
        ]);
        assert!(reply.signals.is_empty());
        let container = session.resources.container("api").expect("container");
        assert_eq!(container.logs[1], "App listening on 0.0.0.0:90");
        assert_eq!(container.logs[2], COMPLETION_MARKER);
    }

    #[test]
    fn run_echoes_ports_as_typed_and_only_exact_spelling_signals() {
        let (_, session) = exec_all(&["docker pull nginx"]);
        for (line, echoed) in [
            ("docker run --name web -p 08080:080 nginx", "08080:080"),
            ("docker run --name web -p 8080:8080 nginx", "8080:8080"),
            ("docker run --name web -p 99999:80 nginx", "99999:80"),
        ] {
            let (reply, next) = exec(&session, line);
            assert_eq!(
                reply.lines,
                vec![format!("Started container 'web' (ports {echoed})")],
                "line: {line}"
            );
            assert!(reply.signals.is_empty(), "line: {line}");
            let web = next.resources.container("web").expect("web");
            assert_eq!(web.ports.to_string(), echoed);
        }
    }

    #[test]
    fn run_accepts_flags_in_any_order() {
        let (reply, _) = exec_all(&["docker pull nginx", "docker run -p 8080:80 --name web nginx"]);
        assert_eq!(reply.signals, vec![TaskSignal::done(TASK_RUN)]);
    }

    #[test]
    fn ps_truncates_long_names() {
        let (reply, _) = exec_all(&[
            "docker pull nginx",
            "docker run --name a-very-long-container-name -p 1:2 nginx",
            "docker ps",
        ]);
        assert_eq!(reply.lines, vec!["a-very-long-   nginx   Up"]);
    }

    #[test]
    fn logs_reports_usage_and_missing_container() {
        let (reply, _) = exec_all(&["docker logs"]);
        assert_eq!(reply.lines, vec![LOGS_USAGE]);
        let (reply, _) = exec_all(&["docker logs web"]);
        assert_eq!(reply.lines, vec!["No such container: web"]);
        assert!(reply.signals.is_empty());
    }

    #[test]
    fn any_successful_log_view_signals_logs() {
        let (reply, _) = exec_all(&[
            "docker pull nginx",
            "docker run --name other -p 1:2 nginx",
            "docker logs other",
        ]);
        assert_eq!(reply.lines.len(), 3);
        assert!(reply.lines[0].contains("Starting other from nginx"));
        assert_eq!(reply.signals, vec![TaskSignal::done(TASK_LOGS)]);
    }

    #[test]
    fn restore_rebuilds_resources_from_tasks() {
        let tasks: TaskState = [(TASK_PULL, true), (TASK_RUN, true)].into_iter().collect();
        let session = Session::default().restore(&tasks, Local::now());
        assert!(session.resources.has_image(BOOTSTRAP_IMAGE));
        let web = session.resources.container(CANONICAL_NAME).expect("web");
        assert_eq!(web.ports.to_string(), CANONICAL_PORTS);
        assert!(web.running);
    }

    #[test]
    fn restore_keeps_existing_containers() {
        let (_, session) = exec_all(&["docker pull nginx", "docker run --name web -p 1:2 nginx"]);
        let tasks: TaskState = [(TASK_RUN, true)].into_iter().collect();
        let restored = session.restore(&tasks, Local::now());
        assert_eq!(
            restored.resources.container("web").map(|c| c.ports.host.as_str()),
            Some("1")
        );
    }
}
