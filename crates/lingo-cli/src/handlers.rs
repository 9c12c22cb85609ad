//! Handlers registered by the command-line front end.
//!
//! They go through the background loader like any other handler, so `calculator` and
//! `system_info` land in the essential tier and `memory` loads with the unclassified
//! remainder.

use lingo_core::{Error, Handler, HandlerFactory, InMemoryConversation, Invocation, Result};
use regex::Regex;
use std::env::consts::{ARCH, OS};
use std::sync::Arc;
use std::thread;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// Every handler the CLI ships, sharing `memory` with the engine.
pub fn factories(memory: &Arc<InMemoryConversation>) -> Vec<Arc<dyn HandlerFactory>> {
    vec![
        Arc::new(CalculatorFactory),
        Arc::new(SystemInfoFactory),
        Arc::new(MemoryFactory {
            memory: Arc::clone(memory),
        }),
    ]
}

// ----------------------------------------------------------------------------
// Calculator
// ----------------------------------------------------------------------------

const EXPRESSION: &str = r"(?i)(-?\d+(?:[.,]\d+)?)\s*(\+|-|\*|/|x|cộng|trừ|nhân|chia|plus|minus|times)\s*(-?\d+(?:[.,]\d+)?)";

/// Binary arithmetic with Vietnamese or English operator words.
pub struct Calculator {
    expression: Regex,
}

impl Calculator {
    /// # Errors
    /// Returns an error if the expression pattern fails to compile.
    pub fn new() -> Result<Self> {
        let expression = Regex::new(EXPRESSION)
            .map_err(|error| Error::Other(format!("invalid calculator pattern: {error}")))?;
        Ok(Self { expression })
    }

    fn evaluate(&self, text: &str) -> Result<Option<String>> {
        let Some(captures) = self.expression.captures(text) else {
            return Ok(None);
        };
        let left = parse_number(&captures[1])?;
        let right = parse_number(&captures[3])?;
        let (symbol, value) = match captures[2].to_lowercase().as_str() {
            "+" | "cộng" | "plus" => ('+', left + right),
            "-" | "trừ" | "minus" => ('-', left - right),
            "*" | "x" | "nhân" | "times" => ('×', left * right),
            _ => {
                if right == 0.0 {
                    return Err(Error::HandlerExecution(
                        "Không thể chia cho 0".to_owned(),
                    ));
                }
                ('÷', left / right)
            }
        };
        Ok(Some(format!(
            "{} {symbol} {} = {}",
            display(left),
            display(right),
            display(value)
        )))
    }
}

impl Handler for Calculator {
    fn handle(&self, invocation: &Invocation) -> Result<String> {
        Ok(self.evaluate(&invocation.parameter)?.unwrap_or_else(|| {
            "Tôi chưa hiểu phép tính này. Hãy thử: tính 12 cộng 7".to_owned()
        }))
    }

    fn keywords(&self) -> Vec<String> {
        strings(&["tính", "phép tính", "calculate"])
    }

    fn patterns(&self) -> Vec<String> {
        strings(&["tính 12 cộng 7", "5 nhân 6 bằng mấy", "100 chia 4"])
    }
}

fn parse_number(raw: &str) -> Result<f64> {
    raw.replace(',', ".")
        .parse()
        .map_err(|error| Error::HandlerExecution(format!("Số không hợp lệ '{raw}': {error}")))
}

/// Rounds away floating-point noise; whole numbers print without a fraction.
fn display(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == 0.0 {
        return "0".to_owned();
    }
    rounded.to_string()
}

struct CalculatorFactory;

impl HandlerFactory for CalculatorFactory {
    fn name(&self) -> &str {
        "calculator"
    }

    fn load(&self) -> Result<Box<dyn Handler>> {
        Ok(Box::new(Calculator::new()?))
    }
}

// ----------------------------------------------------------------------------
// System information
// ----------------------------------------------------------------------------

/// Reports the operating system, architecture and logical CPU count.
pub struct SystemInfo;

impl Handler for SystemInfo {
    fn handle(&self, _invocation: &Invocation) -> Result<String> {
        let cpus = thread::available_parallelism().map_or(1, usize::from);
        Ok(format!(
            "Hệ điều hành: {OS}\nKiến trúc: {ARCH}\nSố CPU logic: {cpus}"
        ))
    }

    fn keywords(&self) -> Vec<String> {
        strings(&["cpu", "hệ điều hành"])
    }

    fn patterns(&self) -> Vec<String> {
        strings(&["thông tin hệ thống", "máy tính của tôi chạy hệ điều hành gì"])
    }
}

struct SystemInfoFactory;

impl HandlerFactory for SystemInfoFactory {
    fn name(&self) -> &str {
        "system_info"
    }

    fn load(&self) -> Result<Box<dyn Handler>> {
        Ok(Box::new(SystemInfo))
    }
}

// ----------------------------------------------------------------------------
// Conversation memory control
// ----------------------------------------------------------------------------

const PEEK_TURNS: usize = 6;

/// Turns conversation recording on and off, clears it, or shows recent turns.
pub struct MemoryControl {
    memory: Arc<InMemoryConversation>,
}

impl MemoryControl {
    /// Control over the shared conversation memory.
    pub fn new(memory: Arc<InMemoryConversation>) -> Self {
        Self { memory }
    }
}

impl Handler for MemoryControl {
    fn handle(&self, invocation: &Invocation) -> Result<String> {
        let request = invocation.parameter.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|word| request.contains(word));

        if mentions(&["tắt", "disable"]) {
            self.memory.disable();
            return Ok("Đã tắt ghi nhớ hội thoại.".to_owned());
        }
        if mentions(&["bật", "enable"]) {
            self.memory.enable();
            return Ok("Đã bật ghi nhớ hội thoại.".to_owned());
        }
        if mentions(&["xóa", "xoá", "clear"]) {
            self.memory.clear();
            return Ok("Đã xóa bộ nhớ hội thoại.".to_owned());
        }

        let turns = self.memory.peek(PEEK_TURNS);
        if turns.is_empty() {
            return Ok("Bộ nhớ hội thoại đang trống.".to_owned());
        }
        let lines: Vec<String> = turns
            .iter()
            .map(|turn| {
                format!(
                    "[{}] {}: {}",
                    turn.timestamp.format("%H:%M:%S"),
                    turn.role,
                    turn.content
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn keywords(&self) -> Vec<String> {
        strings(&["bộ nhớ", "memory"])
    }

    fn patterns(&self) -> Vec<String> {
        strings(&["xem bộ nhớ", "xóa bộ nhớ", "tắt bộ nhớ"])
    }
}

struct MemoryFactory {
    memory: Arc<InMemoryConversation>,
}

impl HandlerFactory for MemoryFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<Box<dyn Handler>> {
        Ok(Box::new(MemoryControl::new(Arc::clone(&self.memory))))
    }
}
