#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("ribbon_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use ribbon_engine::geom::Point3;
    use ribbon_engine::parse::{self, PresetRig, RibbonPreset};
    use ribbon_engine::rig::{RibbonDiagnostics, RibbonEvaluation, TransformProvider};
    use std::fmt::Write as _;
    use std::fs;
    use std::path::{Path, PathBuf};

    const SNAPSHOT_QUANTIZE: f64 = 1e-6;
    const SNAPSHOT_DECIMALS: usize = 6;

    const USAGE: &str = r#"ribbon_cli (ribbon-engine)

USAGE:
  ribbon_cli list
  ribbon_cli run <preset|all> [options]
  ribbon_cli load <file.xml> [options]

PRESETS:
  spine_open
  tail_arc_length
  ring_periodic
  neck_aim_up

OPTIONS (run, load):
  --move <name>=<x>,<y>,<z>  Move a control before evaluating (repeatable)
  --delete <name>            Remove a control before evaluating (repeatable)
  --out-dir <dir>            Write <preset>.snap to this dir (required for `run all`)
  --snap <path>              Write the snapshot to a file instead of stdout
  --overwrite                Overwrite existing output files
  -v, --verbose              Debug logging (RUST_LOG is honored as well)
  -h, --help                 Show this help
"#;

    const SPINE_OPEN: &str = r#"<ribbon name="spine_open" degree="3" joints="7">
  <control name="hips" x="0" y="0" z="0"/>
  <control name="belly" x="0" y="1" z="0.15"/>
  <control name="chest" x="0" y="2" z="0.1"/>
  <control name="upper_chest" x="0" y="3" z="-0.1"/>
  <control name="neck_base" x="0" y="4" z="0"/>
</ribbon>"#;

    const TAIL_ARC_LENGTH: &str = r#"<ribbon name="tail_arc_length" degree="2" joints="9" sampling="arc_length">
  <control name="root" x="0" y="0" z="0"/>
  <control name="mid" x="0" y="0" z="-0.5"/>
  <control name="far" x="0" y="-1" z="-4"/>
  <control name="tip" x="0" y="-3" z="-6"/>
</ribbon>"#;

    const RING_PERIODIC: &str = r#"<ribbon name="ring_periodic" degree="3" joints="12" form="periodic">
  <control name="n" x="0" y="1" z="0"/>
  <control name="ne" x="0.7071" y="0.7071" z="0"/>
  <control name="e" x="1" y="0" z="0"/>
  <control name="s" x="0" y="-1" z="0"/>
  <control name="w" x="-1" y="0" z="0"/>
</ribbon>"#;

    const NECK_AIM_UP: &str = r#"<ribbon name="neck_aim_up" degree="2" joints="5" aim="+y" up="+z" blend="aim_up">
  <control name="neck_base" x="0" y="0" z="0"/>
  <control name="neck_mid" x="0" y="0.5" z="0.1" rx="0.3826834" ry="0" rz="0" rw="0.9238795"/>
  <control name="head" x="0" y="1" z="0.2" rx="0.7071068" ry="0" rz="0" rw="0.7071068"/>
</ribbon>"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let verbose = args.iter().any(|arg| arg == "-v" || arg == "--verbose");
        init_logging(verbose);

        let args: Vec<String> = args
            .into_iter()
            .filter(|arg| arg != "-v" && arg != "--verbose")
            .collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                print_presets();
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "load" => cmd_load(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn init_logging(verbose: bool) {
        let level = if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        };
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init();
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_presets() {
        for preset in Preset::ALL {
            println!("{}", preset.name());
        }
    }

    /// Control edits, applied in command-line order.
    #[derive(Debug, Clone, PartialEq)]
    enum Edit {
        Move(String, Point3),
        Delete(String),
    }

    #[derive(Debug, Default)]
    struct RunOptions {
        edits: Vec<Edit>,
        out_dir: Option<PathBuf>,
        snap_path: Option<PathBuf>,
        overwrite: bool,
        help: bool,
    }

    fn parse_run_options(args: &mut Args) -> Result<RunOptions, String> {
        let mut options = RunOptions::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--move" => {
                    let (name, position) = parse_move(&args.value("--move")?)?;
                    options.edits.push(Edit::Move(name, position));
                }
                "--delete" => options.edits.push(Edit::Delete(args.value("--delete")?)),
                "--out-dir" => options.out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                "--snap" => options.snap_path = Some(PathBuf::from(args.value("--snap")?)),
                "--overwrite" => options.overwrite = true,
                "-h" | "--help" => options.help = true,
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }
        if options.out_dir.is_some() && options.snap_path.is_some() {
            return Err("use either --out-dir or --snap (not both)".to_string());
        }
        Ok(options)
    }

    fn parse_move(value: &str) -> Result<(String, Point3), String> {
        let (name, coords) = value
            .split_once('=')
            .ok_or_else(|| format!("--move expects <name>=<x>,<y>,<z>, got `{value}`"))?;
        let parts: Vec<f64> = coords
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("--move `{value}`: {e}"))
            })
            .collect::<Result<_, _>>()?;
        let [x, y, z] = parts[..] else {
            return Err(format!("--move `{value}`: expected three coordinates"));
        };
        Ok((name.trim().to_owned(), Point3::new(x, y, z)))
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let preset_name = args.next().ok_or("missing preset name")?;
        let options = parse_run_options(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }

        if preset_name == "all" {
            let dir = options
                .out_dir
                .as_deref()
                .ok_or("`run all` requires --out-dir")?;
            for preset in Preset::ALL {
                let preset = parse_preset(preset.xml())?;
                run_preset(&preset, &options, Some(dir))?;
            }
            return Ok(());
        }

        let preset = Preset::from_str(&preset_name).ok_or_else(|| unknown_preset(&preset_name))?;
        let preset = parse_preset(preset.xml())?;
        run_preset(&preset, &options, options.out_dir.as_deref())
    }

    fn cmd_load(args: &mut Args) -> Result<(), String> {
        let path = PathBuf::from(args.next().ok_or("missing preset file")?);
        let options = parse_run_options(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }

        let xml = fs::read_to_string(&path).map_err(|e| format!("read {}: {e}", path.display()))?;
        let mut preset = parse_preset(&xml)?;
        if preset.name.is_none() {
            preset.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }
        run_preset(&preset, &options, options.out_dir.as_deref())
    }

    fn parse_preset(xml: &str) -> Result<RibbonPreset, String> {
        parse::parse_str(xml).map_err(|e| format!("preset: {e}"))
    }

    fn run_preset(preset: &RibbonPreset, options: &RunOptions, dir: Option<&Path>) -> Result<(), String> {
        let name = preset.name.clone().unwrap_or_else(|| "ribbon".to_owned());
        let rig = preset.build().map_err(|e| format!("{name}: {e}"))?;
        let rest = rig.ribbon.evaluate();

        apply_edits(&rig, options)?;
        let evaluation = rig.ribbon.evaluate();
        let text = snapshot(&name, &rig, &evaluation);

        if let Some(dir) = dir {
            fs::create_dir_all(dir).map_err(|e| format!("create out dir: {e}"))?;
            let path = dir.join(format!("{name}.snap"));
            write_text_file(&path, &text, options.overwrite)?;
            eprintln!("wrote {}", path.display());
        } else if let Some(path) = options.snap_path.as_deref() {
            write_text_file(path, &text, options.overwrite)?;
            eprintln!("wrote {}", path.display());
        } else {
            print!("{text}");
        }

        let moved = rest
            .transforms
            .iter()
            .zip(&evaluation.transforms)
            .filter(|(a, b)| a != b)
            .count();
        eprintln!(
            "{name}: controls={} joints={} moved={moved} frozen={} | {}",
            rig.handles.len(),
            evaluation.transforms.len(),
            evaluation.warnings.len(),
            diagnostics_summary(rig.ribbon.diagnostics())
        );
        Ok(())
    }

    fn apply_edits(rig: &PresetRig, options: &RunOptions) -> Result<(), String> {
        for edit in &options.edits {
            match edit {
                Edit::Move(name, position) => {
                    let handle = rig.handle(name).ok_or_else(|| unknown_control(rig, name))?;
                    if !handle.set_position(*position) {
                        return Err(format!("control `{name}` was deleted before it could be moved"));
                    }
                    log::debug!("moved {name} to {position:?}");
                }
                Edit::Delete(name) => {
                    rig.handle(name)
                        .ok_or_else(|| unknown_control(rig, name))?
                        .remove();
                    log::debug!("deleted {name}");
                }
            }
        }
        Ok(())
    }

    fn unknown_control(rig: &PresetRig, name: &str) -> String {
        let mut msg = format!("unknown control `{name}`\n\navailable controls:\n");
        for handle in &rig.handles {
            let _ = writeln!(msg, "  {}", handle.name());
        }
        msg
    }

    fn unknown_preset(name: &str) -> String {
        let mut msg = format!("unknown preset `{name}`\n\navailable presets:\n");
        for preset in Preset::ALL {
            let _ = writeln!(msg, "  {}", preset.name());
        }
        msg
    }

    fn diagnostics_summary(diag: &RibbonDiagnostics) -> String {
        format!(
            "degree={} knots={} length={:.6} partition_err={:.3e}",
            diag.degree, diag.knot_count, diag.curve_length, diag.max_partition_error
        )
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        fs::write(path, normalize_snapshot_text(text)).map_err(|e| format!("write {}: {e}", path.display()))
    }

    fn normalize_snapshot_text(text: &str) -> String {
        let normalized = text.replace("\r\n", "\n");
        if normalized.ends_with('\n') {
            normalized
        } else {
            format!("{normalized}\n")
        }
    }

    fn quantize_f64(value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let q = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
        if q == 0.0 { 0.0 } else { q }
    }

    fn write_f64(out: &mut String, value: f64) {
        let value = quantize_f64(value);
        let _ = write!(out, "{value:.SNAPSHOT_DECIMALS$}");
    }

    fn write_values(out: &mut String, prefix: &str, values: &[f64]) {
        let _ = write!(out, "{prefix}");
        for value in values {
            out.push(' ');
            write_f64(out, *value);
        }
        out.push('\n');
    }

    fn snapshot(name: &str, rig: &PresetRig, evaluation: &RibbonEvaluation) -> String {
        let ribbon = &rig.ribbon;
        let options = ribbon.options();
        let mut out = String::new();
        let _ = writeln!(out, "# ribbon-engine snapshot v1");
        let _ = writeln!(out, "preset {name}");
        let _ = writeln!(out, "quantize {SNAPSHOT_QUANTIZE:.1e}");
        let _ = writeln!(
            out,
            "ribbon form={:?} sampling={:?} blend={:?} aim={} up={}",
            options.form, options.sampling, options.orientation, options.aim_axis, options.up_axis
        );
        write_values(&mut out, "knots", ribbon.curve().knots().values());

        let _ = writeln!(out, "controls {}", rig.handles.len());
        for handle in &rig.handles {
            match handle.world_transform() {
                Some(t) => write_values(
                    &mut out,
                    &format!("control {}", handle.name()),
                    &t.position.to_array(),
                ),
                None => {
                    let _ = writeln!(out, "control {} deleted", handle.name());
                }
            }
        }

        let _ = writeln!(out, "joints {}", evaluation.transforms.len());
        for (joint, transform) in ribbon.joints().iter().zip(&evaluation.transforms) {
            let q = transform.orientation;
            let _ = write!(out, "joint {} t=", joint.index());
            write_f64(&mut out, joint.parameter());
            write_values(&mut out, " p", &transform.position.to_array());
            write_values(&mut out, "  q", &[q.x, q.y, q.z, q.w]);
            write_values(&mut out, "  w", joint.weights().values());
        }

        for warning in &evaluation.warnings {
            let _ = writeln!(out, "warning {warning}");
        }
        normalize_snapshot_text(&out)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Preset {
        SpineOpen,
        TailArcLength,
        RingPeriodic,
        NeckAimUp,
    }

    impl Preset {
        const ALL: &'static [Preset] = &[
            Preset::SpineOpen,
            Preset::TailArcLength,
            Preset::RingPeriodic,
            Preset::NeckAimUp,
        ];

        fn name(self) -> &'static str {
            match self {
                Preset::SpineOpen => "spine_open",
                Preset::TailArcLength => "tail_arc_length",
                Preset::RingPeriodic => "ring_periodic",
                Preset::NeckAimUp => "neck_aim_up",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            Preset::ALL.iter().copied().find(|preset| preset.name() == name)
        }

        fn xml(self) -> &'static str {
            match self {
                Preset::SpineOpen => SPINE_OPEN,
                Preset::TailArcLength => TAIL_ARC_LENGTH,
                Preset::RingPeriodic => RING_PERIODIC,
                Preset::NeckAimUp => NECK_AIM_UP,
            }
        }
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }

}
