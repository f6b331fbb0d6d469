#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

/// Fuzzing-friendly NEM word; joined with spaces into a source line soup.
#[derive(Arbitrary, Debug)]
enum FuzzWord {
    Ident,
    Unit,
    IntLit(u16),
    FloatLit,
    StringLit,
    Const,
    Buffer,
    Let,
    Region,
    Loop,
    Endloop,
    Ddr,
    L1,
    Elem,
    Shape,
    Quant,
    PerTensor,
    Plus,
    Minus,
    Star,
    Mod,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Equals,
    At,
    Newline,
}

impl FuzzWord {
    fn text(&self) -> String {
        match self {
            FuzzWord::Ident => "x".to_string(),
            FuzzWord::Unit => "DMA".to_string(),
            FuzzWord::IntLit(n) => n.to_string(),
            FuzzWord::FloatLit => "0.5".to_string(),
            FuzzWord::StringLit => "\"s\"".to_string(),
            FuzzWord::Const => "const".to_string(),
            FuzzWord::Buffer => "buffer".to_string(),
            FuzzWord::Let => "let".to_string(),
            FuzzWord::Region => "region".to_string(),
            FuzzWord::Loop => "loop".to_string(),
            FuzzWord::Endloop => "endloop".to_string(),
            FuzzWord::Ddr => "DDR".to_string(),
            FuzzWord::L1 => "L1".to_string(),
            FuzzWord::Elem => "elem".to_string(),
            FuzzWord::Shape => "shape".to_string(),
            FuzzWord::Quant => "quant".to_string(),
            FuzzWord::PerTensor => "per_tensor".to_string(),
            FuzzWord::Plus => "+".to_string(),
            FuzzWord::Minus => "-".to_string(),
            FuzzWord::Star => "*".to_string(),
            FuzzWord::Mod => "mod".to_string(),
            FuzzWord::LeftParen => "(".to_string(),
            FuzzWord::RightParen => ")".to_string(),
            FuzzWord::LeftBracket => "[".to_string(),
            FuzzWord::RightBracket => "]".to_string(),
            FuzzWord::Comma => ",".to_string(),
            FuzzWord::Colon => ":".to_string(),
            FuzzWord::Equals => "=".to_string(),
            FuzzWord::At => "@".to_string(),
            FuzzWord::Newline => "\n".to_string(),
        }
    }
}

#[derive(Arbitrary, Debug)]
struct FuzzSource {
    words: Vec<FuzzWord>,
}

fuzz_target!(|input: FuzzSource| {
    let source = input.words.iter().map(FuzzWord::text).collect::<Vec<_>>().join(" ");

    // Parse, evaluate, and format - none of these should panic
    let out = nemc::check_source(&source, "fuzz.nem", &nemc::ConstEnv::new());
    if !out.diagnostics.has_errors() {
        let _ = nemc::format_source(&source, "fuzz.nem");
    }
});
