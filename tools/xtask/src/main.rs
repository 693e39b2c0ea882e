//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-core`: 运行 fieldcode-core 覆盖率
//! - `expr-check`: 对表达式文件运行沙箱校验

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use clap::{Parser, Subcommand};
use fieldcode_core::{CompilerConfig, SandboxValidator, ValidationResult};
use tracing::{Level, debug};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "开发辅助工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行 fmt、clippy、test 门禁检查
    CheckAll,
    /// 运行 fieldcode-core 覆盖率报告
    CovCore,
    /// 对表达式文件运行沙箱校验
    ///
    /// 每个非空、非 `#` 开头的行是一条表达式。
    /// 不带参数时检查 expressions/ 下所有 .expr 文件。
    ExprCheck {
        /// 表达式文件或目录
        path: Option<PathBuf>,

        /// 编译器配置文件（JSON），用于扩展沙箱白名单
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn ensure_cargo_llvm_cov_available() -> anyhow::Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["llvm-cov", "--version"]);
    match cmd.status() {
        Ok(s) if s.success() => Ok(()),
        _ => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(cli.command) {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::CheckAll => {
            let mut fmt = Command::new("cargo");
            fmt.args(["fmt", "--all", "--", "--check"]);
            run("cargo fmt --all -- --check", &mut fmt)?;

            let mut clippy = Command::new("cargo");
            clippy.args(["clippy", "--workspace", "--all-targets"]);
            run("cargo clippy --workspace --all-targets", &mut clippy)?;

            let mut test = Command::new("cargo");
            test.args(["test", "--workspace"]);
            run("cargo test --workspace", &mut test)?;
        }
        Commands::CovCore => {
            ensure_cargo_llvm_cov_available()?;

            let mut cov = Command::new("cargo");
            cov.args(["llvm-cov", "-p", "fieldcode-core", "--all-features", "--html"]);
            run(
                "cargo llvm-cov -p fieldcode-core --all-features --html",
                &mut cov,
            )?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        Commands::ExprCheck { path, config } => {
            expr_check(path.as_deref(), config.as_deref())?;
        }
    }

    Ok(())
}

//=============================================================================
// expr-check 命令实现
//=============================================================================

/// 默认表达式目录（相对于 workspace root）
const DEFAULT_EXPRESSIONS_DIR: &str = "expressions";

/// 表达式文件扩展名
const EXPRESSION_EXTENSION: &str = "expr";

/// 检查结果
#[derive(Default)]
struct ExprCheckResult {
    files_checked: usize,
    expressions_checked: usize,
    read_errors: usize,
    validation: ValidationResult,
}

/// 执行表达式检查
fn expr_check(path: Option<&Path>, config: Option<&Path>) -> anyhow::Result<()> {
    let validator = match config {
        Some(p) => SandboxValidator::new(&CompilerConfig::load(p)?.sandbox)?,
        None => SandboxValidator::default(),
    };

    let files = match path {
        Some(p) if p.is_file() => vec![p.to_path_buf()],
        Some(p) if p.is_dir() => collect_expression_files(p),
        Some(p) => anyhow::bail!("路径不存在: {}", p.display()),
        None => {
            let dir = Path::new(DEFAULT_EXPRESSIONS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认表达式目录不存在: {}\n请在 workspace 根目录运行，或指定路径",
                    dir.display()
                );
            }
            collect_expression_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到表达式文件（.{EXPRESSION_EXTENSION}）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个表达式文件...\n", files.len());

    let mut result = ExprCheckResult::default();
    for file in &files {
        check_expression_file(file, &validator, &mut result);
    }

    print_check_result(&result);

    if result.read_errors > 0 || result.validation.has_errors() {
        anyhow::bail!("表达式检查发现错误");
    }
    Ok(())
}

/// 收集目录下的所有表达式文件
fn collect_expression_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == EXPRESSION_EXTENSION))
        .collect();
    files.sort();
    files
}

/// 检查单个表达式文件
fn check_expression_file(file: &Path, validator: &SandboxValidator, result: &mut ExprCheckResult) {
    let file_id = file.display().to_string();
    result.files_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", file_id, e);
            result.read_errors += 1;
            return;
        }
    };

    for (index, line) in content.lines().enumerate() {
        let expression = line.trim();
        if expression.is_empty() || expression.starts_with('#') {
            continue;
        }
        result.expressions_checked += 1;

        let validation = validator.validate(expression);
        debug!(file = %file_id, line = index + 1, valid = validation.is_valid, "表达式已校验");
        for message in &validation.messages {
            eprintln!("{}:{}: {}", file_id, index + 1, message);
        }
        result.validation.merge(validation);
    }
}

/// 输出检查结果
fn print_check_result(result: &ExprCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!(
        "检查完成: {} 个文件, {} 条表达式",
        result.files_checked, result.expressions_checked
    );

    let error_count = result.read_errors + result.validation.error_count();
    let warn_count = result.validation.warning_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
