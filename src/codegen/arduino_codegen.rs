//! # Arduino C Code Generator
//!
//! Generates Arduino C source from validated block graphs.

use super::statements;
use crate::config::CodegenOptions;
use crate::graph::{Block, BlockId, BlockKind};
use crate::validator::ValidatedGraph;

/// Block-graph to Arduino C generator
///
/// Walks the graph from its start block. The indent level is carried with
/// each pending chain: it grows by one when entering a loop body or
/// conditional branch and stays put along a `next` chain.
pub struct ArduinoCodeGenerator<'a> {
    graph: ValidatedGraph<'a>,
    options: CodegenOptions,
}

/// Pending output, consumed from the top of the work stack.
enum Work {
    /// Statements starting at a block, joined by newlines.
    Chain {
        link: Option<BlockId>,
        indent_level: usize,
    },
    Text(String),
}

impl<'a> ArduinoCodeGenerator<'a> {
    pub fn new(graph: ValidatedGraph<'a>, options: CodegenOptions) -> Self {
        Self { graph, options }
    }

    /// Generate the complete program
    pub fn generate_program(&self) -> String {
        tracing::info!(
            "[CODEGEN] Generating program from start block {}",
            self.graph.entry()
        );
        let code = self.emit(Some(self.graph.entry()), 0);
        tracing::info!("[CODEGEN] Generated {} bytes", code.len());
        code
    }

    /// Emit the chain of statements starting at `link`, all at `indent_level`.
    ///
    /// Uses an explicit work stack instead of recursion, so neither long
    /// chains nor deep nesting can exhaust the call stack.
    fn emit(&self, link: Option<BlockId>, indent_level: usize) -> String {
        let mut code = String::new();
        let mut work = vec![Work::Chain { link, indent_level }];

        while let Some(item) = work.pop() {
            match item {
                Work::Text(text) => code.push_str(&text),
                Work::Chain { link: None, .. } => {}
                Work::Chain {
                    link: Some(id),
                    indent_level,
                } => {
                    let block = self.block(id);
                    tracing::debug!(
                        "[CODEGEN] Block {} ({}) at level {}",
                        id,
                        block.kind.tag(),
                        indent_level
                    );

                    // A start block's `next` is the program body, emitted inside it.
                    if !block.is_start() && block.next.is_some() {
                        work.push(Work::Chain {
                            link: block.next,
                            indent_level,
                        });
                        work.push(Work::Text("\n".to_string()));
                    }
                    self.schedule_block(block, indent_level, &mut work);
                }
            }
        }

        code
    }

    /// Queue one block's text, including nested bodies but not its `next`.
    fn schedule_block(&self, block: &Block, indent_level: usize, work: &mut Vec<Work>) {
        let indent = self.indent(indent_level);
        let body = |link: Option<BlockId>| Work::Chain {
            link,
            indent_level: indent_level + 1,
        };

        // Pieces in output order; pushed reversed below.
        let pieces = match &block.kind {
            BlockKind::Start => vec![
                Work::Text(statements::program_open(&indent)),
                body(block.next),
                Work::Text(statements::program_close(&indent)),
            ],
            BlockKind::Loop { condition, child } => vec![
                Work::Text(statements::while_open(&indent, condition)),
                body(*child),
                Work::Text(statements::body_close(&indent)),
            ],
            BlockKind::Conditional {
                condition,
                if_true,
                if_false,
            } => vec![
                Work::Text(statements::if_open(&indent, condition)),
                body(if_true.target()),
                Work::Text(statements::else_open(&indent)),
                body(if_false.target()),
                Work::Text(statements::body_close(&indent)),
            ],
            BlockKind::Read { variable, pin } => {
                vec![Work::Text(statements::digital_read(&indent, variable, *pin))]
            }
            BlockKind::Write { pin, value } => {
                vec![Work::Text(statements::digital_write(&indent, *pin, *value))]
            }
            BlockKind::Sleep { length } => vec![Work::Text(statements::delay(&indent, *length))],
            BlockKind::Code { code } => vec![Work::Text(statements::raw_code(&indent, code))],
            BlockKind::Variable { name } => {
                vec![Work::Text(statements::int_declaration(&indent, name))]
            }
        };

        work.extend(pieces.into_iter().rev());
    }

    fn block(&self, id: BlockId) -> &'a Block {
        match self.graph.graph().get(id) {
            Some(block) => block,
            None => unreachable!("validated graph has no block {}", id),
        }
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(self.options.indent_width * level)
    }
}

/// Generate source for a validated graph with default options
pub fn generate(graph: ValidatedGraph<'_>) -> String {
    generate_with_options(graph, &CodegenOptions::default())
}

/// Generate source with explicit formatting options
pub fn generate_with_options(graph: ValidatedGraph<'_>, options: &CodegenOptions) -> String {
    ArduinoCodeGenerator::new(graph, options.clone()).generate_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BlockGraph, Branch, PinLevel};
    use crate::validator::validate;

    fn block(id: u32, kind: BlockKind, next: Option<u32>) -> Block {
        let mut block = Block::new(id, kind);
        block.next = next.map(BlockId);
        block
    }

    fn write(id: u32, pin: u32, next: Option<u32>) -> Block {
        block(id, BlockKind::Write { pin, value: PinLevel::High }, next)
    }

    fn compile(blocks: Vec<Block>) -> String {
        let graph: BlockGraph = blocks.into_iter().collect();
        generate(validate(&graph).unwrap())
    }

    #[test]
    fn single_write() {
        let code = compile(vec![block(0, BlockKind::Start, Some(1)), write(1, 12, None)]);
        assert_eq!(
            code,
            "void setup() { pinMode(12, OUTPUT); }\nvoid loop()\n{\n  digitalWrite(12,1);\n}\n"
        );
    }

    #[test]
    fn empty_program() {
        let code = compile(vec![block(0, BlockKind::Start, None)]);
        assert_eq!(code, "void setup() { pinMode(12, OUTPUT); }\nvoid loop()\n{\n\n}\n");
    }

    #[test]
    fn loop_body_is_nested_and_next_is_not() {
        let code = compile(vec![
            block(0, BlockKind::Start, Some(1)),
            block(
                1,
                BlockKind::Loop {
                    condition: "i < 10".into(),
                    child: Some(BlockId(2)),
                },
                Some(3),
            ),
            block(2, BlockKind::Code { code: "i++".into() }, None),
            block(3, BlockKind::Sleep { length: 100 }, None),
        ]);

        let expected = "\
void setup() { pinMode(12, OUTPUT); }
void loop()
{
  while (i < 10)
  {
    i++;
  }
  delay(100);
}
";
        assert_eq!(code, expected);
    }

    #[test]
    fn conditional_inside_loop() {
        let code = compile(vec![
            block(0, BlockKind::Start, Some(1)),
            block(
                1,
                BlockKind::Variable { name: "state".into() },
                Some(2),
            ),
            block(
                2,
                BlockKind::Loop {
                    condition: "1".into(),
                    child: Some(BlockId(3)),
                },
                None,
            ),
            block(
                3,
                BlockKind::Read {
                    variable: "state".into(),
                    pin: 2,
                },
                Some(4),
            ),
            block(
                4,
                BlockKind::Conditional {
                    condition: "state".into(),
                    if_true: Branch::To(BlockId(5)),
                    if_false: Branch::To(BlockId(6)),
                },
                Some(7),
            ),
            write(5, 12, None),
            block(6, BlockKind::Write { pin: 12, value: PinLevel::Low }, None),
            block(7, BlockKind::Sleep { length: 20 }, None),
        ]);

        let expected = "\
void setup() { pinMode(12, OUTPUT); }
void loop()
{
  int state = 0;
  while (1)
  {
    state = digitalRead(2);
    if (state)
    {
      digitalWrite(12,1);
    }
    else
    {
      digitalWrite(12,0);
    }
    delay(20);
  }
}
";
        assert_eq!(code, expected);
    }

    #[test]
    fn empty_branch_keeps_braces() {
        let code = compile(vec![
            block(0, BlockKind::Start, Some(1)),
            block(
                1,
                BlockKind::Conditional {
                    condition: "x".into(),
                    if_true: Branch::To(BlockId(2)),
                    if_false: Branch::Empty,
                },
                None,
            ),
            write(2, 4, None),
        ]);
        assert!(code.contains("  if (x)\n  {\n    digitalWrite(4,1);\n  }\n  else\n  {\n\n  }"));
    }

    #[test]
    fn shared_chain_is_emitted_per_reference() {
        let code = compile(vec![
            block(0, BlockKind::Start, Some(1)),
            block(
                1,
                BlockKind::Conditional {
                    condition: "x".into(),
                    if_true: Branch::To(BlockId(2)),
                    if_false: Branch::To(BlockId(2)),
                },
                None,
            ),
            write(2, 4, None),
        ]);
        assert_eq!(code.matches("digitalWrite(4,1);").count(), 2);
    }

    #[test]
    fn indent_width_is_configurable() {
        let graph: BlockGraph = vec![block(0, BlockKind::Start, Some(1)), write(1, 12, None)]
            .into_iter()
            .collect();
        let options = CodegenOptions { indent_width: 4 };
        let code = generate_with_options(validate(&graph).unwrap(), &options);
        assert!(code.contains("\n    digitalWrite(12,1);\n"));
    }

    #[test]
    fn long_chains_do_not_recurse() {
        let mut blocks = vec![block(0, BlockKind::Start, Some(1))];
        let count = 20_000;
        for id in 1..=count {
            let next = if id < count { Some(id + 1) } else { None };
            blocks.push(block(id, BlockKind::Sleep { length: 1 }, next));
        }
        let code = compile(blocks);
        assert_eq!(code.matches("  delay(1);").count(), count as usize);
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let depth = 10_000u32;
        let mut blocks = vec![block(0, BlockKind::Start, Some(1))];
        for id in 1..=depth {
            let kind = if id % 2 == 0 {
                BlockKind::Loop {
                    condition: "1".into(),
                    child: Some(BlockId(id + 1)),
                }
            } else {
                BlockKind::Conditional {
                    condition: "x".into(),
                    if_true: Branch::To(BlockId(id + 1)),
                    if_false: Branch::Empty,
                }
            };
            blocks.push(block(id, kind, None));
        }
        blocks.push(block(depth + 1, BlockKind::Code { code: "tick()".into() }, Some(depth + 2)));
        blocks.push(block(depth + 2, BlockKind::Sleep { length: 1 }, None));

        let graph: BlockGraph = blocks.into_iter().collect();
        let options = CodegenOptions { indent_width: 0 };
        let code = generate_with_options(validate(&graph).unwrap(), &options);

        let loops = (depth / 2) as usize;
        let conditionals = depth as usize - loops;
        assert_eq!(code.matches("while (1)").count(), loops);
        assert_eq!(code.matches("else").count(), conditionals);
        assert_eq!(code.matches('{').count(), code.matches('}').count());
        assert!(code.contains("\ntick();\ndelay(1);\n"));
    }

    #[test]
    fn generation_is_deterministic() {
        let graph: BlockGraph = vec![
            block(0, BlockKind::Start, Some(1)),
            block(1, BlockKind::Code { code: "tone(8, 440)".into() }, Some(2)),
            write(2, 12, None),
        ]
        .into_iter()
        .collect();
        let validated = validate(&graph).unwrap();
        assert_eq!(generate(validated), generate(validated));
    }
}
