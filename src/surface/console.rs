//! Terminal surface. Frames are printed to stdout and commands are read from
//! stdin, one per line. Music plays through an external player process. Used
//! on the desktop and anywhere without a display.

use crate::{
    settings::SettingsOption,
    surface::{Frame, InputEvent, Surface},
};
use anyhow::{bail, Context};
use log::{debug, info, warn};
use std::{
    io::{self, BufRead, Write},
    path::Path,
    process::{Child, Command, Stdio},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

pub struct ConsoleSurface {
    /// Lines typed on stdin. None once stdin closes
    input: Option<Receiver<String>>,
    /// The frame currently on screen
    frame: Option<Frame>,
    volume: f32,
    /// Player command line, without the track
    player: Vec<String>,
    /// The track currently playing, if any
    playing: Option<Child>,
}

impl ConsoleSurface {
    pub const HELP: &'static str = "Commands: p=pause n=next b=back \
        m=settings x=close 1-6=toggle v=volume r=refresh o N=open link q=quit";

    pub fn new(player: Vec<String>) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("stdin".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                debug!("stdin closed");
            })
            .context("Error spawning stdin reader")?;
        info!("{}", Self::HELP);
        Ok(Self {
            input: Some(receiver),
            frame: None,
            volume: 0.0,
            player,
            playing: None,
        })
    }

    /// Decode one line of input. `o N` opens the Nth link on screen
    fn parse(&self, line: &str) -> Option<InputEvent> {
        let mut words = line.split_whitespace();
        let event = match words.next()? {
            "p" => InputEvent::TogglePause,
            "n" => InputEvent::Next,
            "b" => InputEvent::Previous,
            "m" => InputEvent::OpenSettings,
            "x" => InputEvent::CloseSettings,
            "v" => InputEvent::CycleVolume,
            "r" => InputEvent::ForceRefresh,
            "q" => InputEvent::Quit,
            "o" => {
                let number: usize = words.next()?.parse().ok()?;
                let url = self.frame.as_ref()?.link(number)?;
                InputEvent::HeadlineClicked(url.to_owned())
            }
            other => {
                let number: usize = other.parse().ok()?;
                let option = SettingsOption::ALL.get(number.checked_sub(1)?)?;
                InputEvent::Toggle(*option)
            }
        };
        Some(event)
    }

    fn stop_player(&mut self) {
        if let Some(mut child) = self.playing.take() {
            if let Err(err) = child.kill().and_then(|()| child.wait().map(drop)) {
                debug!("Error stopping player: {err}");
            }
        }
    }

    /// Report the track as finished once the player exits
    fn poll_player(&mut self) -> Option<InputEvent> {
        let child = self.playing.as_mut()?;
        match child.try_wait() {
            Ok(None) => None,
            Ok(Some(status)) => {
                if !status.success() {
                    warn!("Music player exited with {status}");
                }
                self.playing = None;
                Some(InputEvent::TrackFinished)
            }
            Err(err) => {
                warn!("Error checking on music player: {err}");
                self.playing = None;
                None
            }
        }
    }

    fn print(&self, frame: &Frame) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout)?;
        match &frame.subtitle {
            Some(subtitle) => writeln!(stdout, "== {} {subtitle} ==", frame.title)?,
            None => writeln!(stdout, "== {} ==", frame.title)?,
        }
        for (i, line) in frame.lines.iter().enumerate() {
            match frame.links.iter().position(|link| link.line == i) {
                Some(link) => writeln!(stdout, "[{}] {line}", link + 1)?,
                None => writeln!(stdout, "    {line}")?,
            }
        }
        if let Some(image) = &frame.image {
            writeln!(stdout, "    ({} byte image)", image.bytes.len())?;
        }
        if !frame.ticker.is_empty() {
            writeln!(stdout, "-- {}", frame.ticker)?;
        }
        stdout.flush()
    }
}

impl Surface for ConsoleSurface {
    fn draw_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if self.frame.as_ref() == Some(frame) {
            return Ok(());
        }
        self.print(frame).context("Error writing frame to stdout")?;
        self.frame = Some(frame.clone());
        Ok(())
    }

    fn play_track(&mut self, track: &Path) -> anyhow::Result<()> {
        self.stop_player();
        let Some((program, args)) = self.player.split_first() else {
            bail!("No music player configured");
        };
        let volume = format!("{:.0}", self.volume * 100.0);
        let child = Command::new(program)
            .args(args.iter().map(|arg| arg.replace("{volume}", &volume)))
            .arg(track)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Error running {program}"))?;
        info!("Now playing {} at {volume}%", track.display());
        self.playing = Some(child);
        Ok(())
    }

    fn stop_music(&mut self) {
        self.stop_player();
        info!("Music stopped");
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        // The player takes volume at startup, so this lands on the next track
        info!("Volume set to {:.0}%", volume * 100.0);
    }

    fn open_link(&mut self, url: &str) -> anyhow::Result<()> {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        info!("Opening {url}");
        let status = Command::new(opener)
            .arg(url)
            .status()
            .with_context(|| format!("Error running {opener}"))?;
        if !status.success() {
            bail!("{opener} exited with {status}");
        }
        Ok(())
    }

    fn poll_input(&mut self) -> Vec<InputEvent> {
        let finished = self.poll_player();
        let mut lines = Vec::new();
        if let Some(receiver) = &self.input {
            loop {
                match receiver.try_recv() {
                    Ok(line) => lines.push(line),
                    Err(TryRecvError::Empty) => break,
                    // Keep running without input, e.g. under a service manager
                    Err(TryRecvError::Disconnected) => {
                        warn!("stdin closed, no more input will be read");
                        self.input = None;
                        break;
                    }
                }
            }
        }

        finished
            .into_iter()
            .chain(lines.iter().filter_map(|line| {
                let event = self.parse(line);
                if event.is_none() && !line.trim().is_empty() {
                    warn!("Unknown command {line:?}. {}", Self::HELP);
                }
                event
            }))
            .collect()
    }
}
