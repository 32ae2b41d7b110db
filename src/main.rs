// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use core::f64::consts::TAU;
use image::ImageFormat;
use phase_portrait::{
    color::ColorScheme,
    compile,
    eval::Program,
    grid::{Window, DEFAULT_RESOLUTION},
    portrait,
    render::RenderConfig,
    shell::{self, Command},
    surface::SurfaceView,
    Number, PortraitErr, Request, Session, PRESETS,
};
use std::{
    fs::{File, OpenOptions},
    io::{stdout, BufWriter, Write},
    process::ExitCode,
};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const DEFAULT_FRAMES: u16 = 24;

fn output_filename(now: DateTime<Local>, kind: &str, ext: &str) -> String {
    format!(
        "{}_{kind}-{}.{ext}",
        env!("CARGO_BIN_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
    )
}

fn create(path: &str) -> anyhow::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to open output file '{path}'"))?;
    Ok(BufWriter::new(file))
}

fn log_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter())
        .init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    req: Request,
    session: Session,
    frames: u16,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        req: Request {
            text: String::from("(z**3 - 1)/(z**2 + 1)"),
            ..Request::default()
        },
        session: Session::new(),
        frames: DEFAULT_FRAMES,
    };

    let mut stdout = BufWriter::new(stdout());
    submit(&mut stdout, &mut state)?;
    loop {
        writeln!(stdout, "f(z) = {}", state.req.text)?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => set_expr(&mut stdout, &mut state)?,

                Command::Presets => pick_preset(&mut stdout, &mut state)?,

                Command::Info => {
                    if let Some(portrait) = state.session.current() {
                        shell::describe(&mut stdout, portrait)?;
                    } else {
                        shell::portrait_undefined(&mut stdout)?;
                    }
                }

                Command::Plot => plot(&mut stdout, &mut state)?,

                Command::Animate => animate(&mut stdout, &mut state)?,

                Command::SetWin => set_win(&mut stdout, &mut state)?,

                Command::Options => set_options(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    if let Some(portrait) = state.session.current() {
                        match Program::compile(&portrait.expression) {
                            Ok(prog) => {
                                shell::dump_program(&mut stdout, &prog, format_args!("program"))?;
                                writeln!(stdout, "cost per point: {}", prog.cost())?;
                            }
                            Err(err) => writeln!(stdout, "compile error: {err}")?,
                        }
                    } else {
                        shell::portrait_undefined(&mut stdout)?;
                    }
                }
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Draws the current request. On failure the previous portrait is kept and
/// the error is explained.
fn submit<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<bool> {
    match state.session.submit(&state.req) {
        Ok(portrait) => {
            writeln!(out, "type: {}", portrait.classification)?;
            Ok(true)
        }
        Err(PortraitErr::Parse(err)) => {
            shell::explain_parse_err(&mut out, &err)?;
            Ok(false)
        }
        Err(err @ PortraitErr::Window(_)) => {
            writeln!(out, "error: {err}")?;
            Ok(false)
        }
    }
}

fn set_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let input = shell::input(&mut out, "f(z) = ")?;
    if input.is_empty() {
        return Ok(());
    }

    // only keep text that compiles
    match compile(&input) {
        Ok(_) => {
            state.req.text = input;
            submit(&mut out, state)?;
        }
        Err(err) => shell::explain_parse_err(&mut out, &err)?,
    }
    Ok(())
}

fn pick_preset<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    shell::list_presets(&mut out)?;
    writeln!(out)?;
    match shell::read_fromstr::<_, usize>(&mut out, "?preset (leave blank to skip) = ", true)? {
        Ok(Some(i)) => match PRESETS.get(i) {
            Some(preset) => {
                state.req.text = preset.text.to_string();
                submit(&mut out, state)?;
            }
            None => writeln!(out, "error: no preset numbered {i}")?,
        },
        Ok(None) | Err(_) => {}
    }
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if let Some(portrait) = state.session.current() {
        writeln!(out, "win = {:#}", portrait.window)?;
        writeln!(out)?;
    }
    writeln!(out, "note: leave blank to skip")?;

    let mut center = state.req.center;
    for (name, dst) in [("center re", &mut center.re), ("center im", &mut center.im)] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    writeln!(out, "note: 'auto' picks a half extent suited to the function")?;
    let cur = match state.req.config.view_limit {
        Some(h) => h.to_string(),
        None => String::from("auto"),
    };
    let mut view_limit = state.req.config.view_limit;
    let input = shell::input(&mut out, format_args!("?half extent (is {cur}) = "))?;
    if input.eq_ignore_ascii_case("auto") {
        view_limit = None;
    } else if !input.is_empty() {
        match input.parse::<Number>() {
            Ok(h) => view_limit = Some(h),
            Err(err) => {
                writeln!(out, "parse error: {err}")?;
                return Ok(());
            }
        }
    }

    let mut resolution = state.req.resolution;
    match shell::read_fromstr::<_, u16>(
        &mut out,
        format_args!("?resolution (is {resolution}, default {DEFAULT_RESOLUTION}) = "),
        true,
    )? {
        Ok(Some(new)) => resolution = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    // reject bad windows before anything is drawn with them
    if let Err(err) = Window::new(center, view_limit.unwrap_or(1.0), resolution) {
        writeln!(out, "error: {err}")?;
        return Ok(());
    }
    state.req.center = center;
    state.req.config.view_limit = view_limit;
    state.req.resolution = resolution;
    submit(&mut out, state)?;
    Ok(())
}

fn set_options<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: leave blank to skip")?;
    let schemes: Vec<&str> = ColorScheme::exhaustive().iter().map(|c| c.name()).collect();
    writeln!(out, "note: color schemes are {}", schemes.join(", "))?;

    let mut config: RenderConfig = state.req.config;
    let mut show_3d = state.req.show_3d;

    match shell::read_fromstr::<_, ColorScheme>(
        &mut out,
        format_args!("?color scheme (is {}) = ", config.color_scheme),
        true,
    )? {
        Ok(Some(new)) => config.color_scheme = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    for (name, dst) in [
        ("contours", &mut config.show_contours),
        ("3d surface", &mut show_3d),
    ] {
        match shell::read_fromstr::<_, bool>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!(
            "?rotation in degrees (is {}) = ",
            config.rotation_angle.to_degrees()
        ),
        true,
    )? {
        Ok(Some(deg)) if deg.is_finite() => config.rotation_angle = deg.to_radians(),
        Ok(Some(deg)) => {
            writeln!(out, "error: rotation must be finite, found {deg}")?;
            return Ok(());
        }
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    state.req.config = config;
    state.req.show_3d = show_3d;
    submit(&mut out, state)?;
    Ok(())
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if !submit(&mut out, state)? {
        return Ok(());
    }
    let Some(portrait) = state.session.current() else {
        shell::portrait_undefined(&mut out)?;
        return Ok(());
    };

    let now = Local::now();

    let phase_path = output_filename(now, "phase", "png");
    let mut file = create(&phase_path)?;
    portrait
        .image
        .write_png(&mut file)
        .context("failed to write phase portrait")?;
    file.flush()?;
    writeln!(out, "wrote {phase_path}")?;

    let modulus_path = output_filename(now, "modulus", "png");
    let mut file = create(&modulus_path)?;
    portrait
        .modulus
        .write_png(&mut file)
        .context("failed to write modulus panel")?;
    file.flush()?;
    writeln!(out, "wrote {modulus_path}")?;

    if let Some(ref mesh) = portrait.mesh {
        let surface_path = output_filename(now, "surface", "png");
        let mut file = create(&surface_path)?;
        mesh.project(&SurfaceView::default())
            .write_to(&mut file, ImageFormat::Png)
            .context("failed to write surface view")?;
        file.flush()?;
        writeln!(out, "wrote {surface_path}")?;

        let obj_path = output_filename(now, "surface", "obj");
        let mut file = create(&obj_path)?;
        mesh.write_obj(&mut file)
            .context("failed to write surface mesh")?;
        file.flush()?;
        writeln!(out, "wrote {obj_path}")?;
    }

    let hidden = portrait.features.iter().count() - portrait.image.markers().len();
    if hidden > 0 {
        writeln!(out, "note: {hidden} zeros or poles lie outside the window")?;
    }
    Ok(())
}

fn animate<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: frames turn the plane through one full rotation")?;
    match shell::read_fromstr::<_, u16>(
        &mut out,
        format_args!("?frames (is {}) = ", state.frames),
        true,
    )? {
        Ok(Some(0)) => {
            writeln!(out, "error: need at least one frame")?;
            return Ok(());
        }
        Ok(Some(new)) => state.frames = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    let now = Local::now();
    let start = state.req.config.rotation_angle;
    for k in 0..state.frames {
        let mut req = state.req.clone();
        req.config.rotation_angle = start + TAU * Number::from(k) / Number::from(state.frames);
        req.show_3d = false;
        let frame = match portrait(&req) {
            Ok(frame) => frame,
            Err(PortraitErr::Parse(err)) => {
                shell::explain_parse_err(&mut out, &err)?;
                return Ok(());
            }
            Err(err) => {
                writeln!(out, "error: {err}")?;
                return Ok(());
            }
        };
        let path = output_filename(now, &format!("frame{k:04}"), "png");
        let mut file = create(&path)?;
        frame
            .image
            .write_png(&mut file)
            .with_context(|| format!("failed to write frame {k}"))?;
        file.flush()?;
    }
    writeln!(
        out,
        "wrote {} frames to {}",
        state.frames,
        output_filename(now, "frame*", "png")
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filenames_carry_kind_and_time() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            output_filename(now, "phase", "png"),
            "phase-portrait_phase-2024-03-09_07-05-01.png"
        );
    }

    #[test]
    fn log_level_comes_from_environment() {
        std::env::set_var("RUST_LOG", "debug");
        assert_eq!(log_filter().max_level_hint(), Some(LevelFilter::DEBUG));
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter().max_level_hint(), Some(LevelFilter::WARN));
    }
}
