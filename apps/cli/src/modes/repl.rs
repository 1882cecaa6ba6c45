//! 交互式菜单循环
//!
//! 单线程阻塞：读取一个菜单键，执行一次会话操作，打印结果，再显示提示符。
//! 提示符显示当前活动电机，如 `ID:1 >>> `。

use crate::menu::{Flow, MenuKey, Prompter, dispatch, print_menu, report_status};
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use servo_driver::{FrameTransport, MotorSession};
use std::io::{self, Write};

/// 终端参数输入（inquire）
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str, default: &str) -> Result<String> {
        let answer = inquire::Text::new(label).with_default(default).prompt()?;
        Ok(answer)
    }
}

/// 提示符文本
pub fn prompt_for<T: FrameTransport>(session: &MotorSession<T>) -> String {
    format!("ID:{} >>> ", session.active_motor())
}

/// 打印活动电机状态（启动时调用）
pub fn print_startup_status<T: FrameTransport>(
    session: &mut MotorSession<T>,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "电机 {} 状态:", session.active_motor())?;
    report_status(session, out)
}

/// 处理一行菜单输入，命令结束后重新打印菜单
///
/// 未知键与被取消的参数输入（Esc / Ctrl+C）都回到菜单。
pub fn handle_line<T: FrameTransport>(
    line: &str,
    session: &mut MotorSession<T>,
    prompter: &mut impl Prompter,
    out: &mut impl Write,
) -> Result<Flow> {
    match line.parse::<MenuKey>() {
        Ok(key) => match dispatch(key, session, prompter, out) {
            Ok(Flow::Quit) => return Ok(Flow::Quit),
            Ok(Flow::Continue) => {},
            Err(e) => match e.downcast_ref::<inquire::InquireError>() {
                Some(
                    inquire::InquireError::OperationCanceled
                    | inquire::InquireError::OperationInterrupted,
                ) => writeln!(out, "已取消")?,
                _ => return Err(e),
            },
        },
        Err(e) => writeln!(out, "❌ {}", e)?,
    }

    writeln!(out)?;
    print_menu(out)?;
    Ok(Flow::Continue)
}

/// 运行菜单循环，直到 `q` 或 Ctrl+D
pub fn run_repl<T: FrameTransport>(session: &mut MotorSession<T>) -> Result<()> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;
    let mut prompter = TerminalPrompter;
    let mut stdout = io::stdout();

    println!("Servo CLI v{} - 交互式菜单", env!("CARGO_PKG_VERSION"));
    print_startup_status(session, &mut stdout)?;
    println!();
    print_menu(&mut stdout)?;

    loop {
        let line = match rl.readline(&prompt_for(session)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C：放弃当前输入
                println!("^C");
                continue;
            },
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        if handle_line(line, session, &mut prompter, &mut stdout)? == Flow::Quit {
            break;
        }
        stdout.flush()?;
    }

    println!("👋 再见！");
    Ok(())
}
