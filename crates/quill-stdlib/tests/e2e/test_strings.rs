use super::helpers::*;
use quill_bytecode::OpCode;
use quill_vm::VmError;

#[test]
fn test_match_with_regex_literal() {
    let (v, _) = run_captured(|b| {
        call_global(b, "match", |b| {
            b.load_str("2024-06-01").load_regex(r"^\d{4}-\d{2}-\d{2}$");
            2
        });
        call_global(b, "match", |b| {
            b.load_str("June 1").load_regex(r"^\d");
            2
        });
        b.emit(OpCode::Cat).emit(OpCode::Ret);
    });
    assert_str(&v, "10");
}

#[test]
fn test_sub_and_gsub() {
    let out = run_output(|b| {
        print(b, |b| {
            b.global("sub").load_str("aaa").load_str("a").load_str("b").call(3);
            1
        });
        print(b, |b| {
            b.global("gsub").load_str("aaa").load_str("a").load_str("b").call(3);
            1
        });
    });
    assert_eq!(out, "baa\nbbb\n");
}

#[test]
fn test_gsub_capture_groups() {
    let (v, _) = run_captured(|b| {
        call_global(b, "gsub", |b| {
            b.load_str("john smith").load_regex(r"(\w+) (\w+)").load_str("$2, $1");
            3
        });
        b.emit(OpCode::Ret);
    });
    assert_str(&v, "smith, john");
}

#[test]
fn test_gsub_number_subject() {
    let (v, _) = run_captured(|b| {
        call_global(b, "gsub", |b| {
            b.load_int(1000000).load_str("0").load_str("_");
            3
        });
        b.emit(OpCode::Ret);
    });
    assert_str(&v, "1______");
}

#[test]
fn test_format() {
    let out = run_output(|b| {
        print(b, |b| {
            b.global("format");
            b.load_str("[%5s][%-5s][%05d][%x][%.3e]");
            b.load_str("ab").load_str("cd").load_int(42).load_int(255).load_float(1234.56);
            b.call(6);
            1
        });
    });
    assert_eq!(out, "[   ab][cd   ][00042][ff][1.235e+03]\n");
}

#[test]
fn test_format_coerces_arguments() {
    let (v, _) = run_captured(|b| {
        call_global(b, "format", |b| {
            b.load_str("%d+%.1f=%s").load_str("2").load_int(3).load_float(5.0);
            4
        });
        b.emit(OpCode::Ret);
    });
    assert_str(&v, "2+3.0=5");
}

#[test]
fn test_bad_pattern_stops_script() {
    let err = run_err(|b| {
        print(b, |b| {
            b.load_str("before");
            1
        });
        call_global(b, "gsub", |b| {
            b.load_str("x").load_str("[").load_str("y");
            3
        });
    });
    assert!(matches!(err, VmError::Regex(_)), "{err}");
}

#[test]
fn test_bad_format_stops_script() {
    let err = run_err(|b| {
        call_global(b, "format", |b| {
            b.load_str("%");
            1
        });
    });
    assert!(matches!(err, VmError::Format(_)), "{err}");
}
