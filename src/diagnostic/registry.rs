/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str, // one-line summary
    pub long: &'static str,  // full explanation for --explain
}

/// Every stable error code the scanner, compiler and VM can report.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Scanner ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LOX-S001",
        short: "unexpected character",
        long: r#"## LOX-S001: unexpected character

A character appeared that does not start any token.

**Example:**

    print 1 # 2;

Lox has no `#` operator. Scanning carries on after the bad character, so
later mistakes on the same line are still reported.
"#,
    },
    ErrorEntry {
        code: "LOX-S002",
        short: "unterminated string",
        long: r#"## LOX-S002: unterminated string

A string literal was opened with `"` but the file ended before the
closing quote.

**Example:**

    print "hello;

Strings may span lines; the error points at the line where the file
ended.
"#,
    },
    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LOX-C001",
        short: "expected an expression",
        long: r#"## LOX-C001: expected an expression

The compiler needed the start of an expression (a literal, a name, `(`,
`-` or `!`) and found something else.

**Example:**

    print 1 + ;
"#,
    },
    ErrorEntry {
        code: "LOX-C002",
        short: "expected a specific token",
        long: r#"## LOX-C002: expected a specific token

A statement or expression was incomplete. The message names the token
that was expected, such as `;` after a value or `)` after a grouped
expression.

**Example:**

    var a = 1
    print a;

The first line is missing its `;`.
"#,
    },
    ErrorEntry {
        code: "LOX-C003",
        short: "invalid assignment target",
        long: r#"## LOX-C003: invalid assignment target

The left side of `=` must be a variable name.

**Example:**

    a + b = 3;

`a + b` is a value, not a variable, so it cannot be assigned to.
"#,
    },
    ErrorEntry {
        code: "LOX-C004",
        short: "variable already declared in this scope",
        long: r#"## LOX-C004: variable already declared in this scope

A block declared the same local name twice.

**Example:**

    {
      var a = 1;
      var a = 2;
    }

Shadowing a name from an enclosing block is allowed; redeclaring it in
the same block is not. Globals may be redeclared freely.
"#,
    },
    ErrorEntry {
        code: "LOX-C005",
        short: "local read in its own initializer",
        long: r#"## LOX-C005: local read in its own initializer

A local variable's initializer referred to the variable being declared.

**Example:**

    {
      var a = a;
    }

Rename the inner variable, or initialize it from a different name.
"#,
    },
    ErrorEntry {
        code: "LOX-C006",
        short: "too many local variables",
        long: r#"## LOX-C006: too many local variables

More locals were in scope at once than the configured limit allows.
Split the block, or move some variables to an enclosing scope.
"#,
    },
    ErrorEntry {
        code: "LOX-C007",
        short: "too many constants",
        long: r#"## LOX-C007: too many constants

The script needs more constants (numbers, strings and global names) than
a 24-bit operand can address.
"#,
    },
    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LOX-R001",
        short: "operand must be a number",
        long: r#"## LOX-R001: operand must be a number

Unary `-` was applied to something other than a number.

**Example:**

    print -"abc";
"#,
    },
    ErrorEntry {
        code: "LOX-R002",
        short: "operands must be numbers",
        long: r#"## LOX-R002: operands must be numbers

`-`, `*`, `/`, `<`, `<=`, `>` and `>=` only work on two numbers.

**Example:**

    print 1 < "2";
"#,
    },
    ErrorEntry {
        code: "LOX-R003",
        short: "operands must be two numbers or two strings",
        long: r#"## LOX-R003: operands must be two numbers or two strings

`+` adds two numbers or concatenates two strings. Mixing the two is an
error; there is no implicit conversion.

**Example:**

    print "total: " + 3;
"#,
    },
    ErrorEntry {
        code: "LOX-R004",
        short: "undefined variable",
        long: r#"## LOX-R004: undefined variable

A global was read or assigned before any `var` declared it.

**Example:**

    x = 1;
    print x;

Declare it first with `var x;`. Assigning to an undefined global does
not create it.
"#,
    },
    ErrorEntry {
        code: "LOX-R005",
        short: "stack overflow",
        long: r#"## LOX-R005: stack overflow

An expression needed more operand stack slots than the VM allows. Raise
the limit or break the expression into several statements.
"#,
    },
    ErrorEntry {
        code: "LOX-R006",
        short: "unknown opcode",
        long: r#"## LOX-R006: unknown opcode

The VM met a byte that is not an instruction. The compiler never emits
one, so this points at a hand-built or corrupted chunk.
"#,
    },
    ErrorEntry {
        code: "LOX-R007",
        short: "output failed",
        long: r#"## LOX-R007: output failed

Writing the result of a `print` statement failed, for example because
standard output was closed.
"#,
    },
    ErrorEntry {
        code: "LOX-R008",
        short: "malformed bytecode",
        long: r#"## LOX-R008: malformed bytecode

An instruction referred to a constant or stack slot that does not exist,
or the chunk ended in the middle of an instruction. Like LOX-R006 this
only happens with chunks the compiler did not produce.
"#,
    },
];

/// Look up an error entry by code (e.g. `"LOX-R004"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}
