use super::helpers::*;
use quill_bytecode::{CodeBuilder, OpCode};
use quill_vm::VmError;

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("quill-e2e-{}-{name}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

/// `h = open(path, mode)` into local `slot`.
fn open_into(b: &mut CodeBuilder, slot: u8, path: &str, mode: &str) {
    set_local(b, slot, |b| {
        call_global(b, "open", |b| {
            b.load_str(path).load_str(mode);
            2
        });
    });
}

fn close(b: &mut CodeBuilder, slot: u8) {
    call_global(b, "close", |b| {
        b.local(slot);
        1
    });
    b.emit(OpCode::Pop);
}

#[test]
fn test_copy_file_line_by_line() {
    let path = temp_path("copy.txt");
    let out = run_output(|b| {
        open_into(b, 0, &path, "w");
        for line in ["alpha", "beta", "gamma"] {
            call_global(b, "write", |b| {
                b.local(0).load_str(line).load_str("\n");
                3
            });
            b.emit(OpCode::Pop);
        }
        close(b, 0);

        // h = open(path); while !eof(h) { print(read(h)) }; close(h)
        open_into(b, 0, &path, "r");
        let top = b.label();
        let done = b.label();
        b.bind(top);
        call_global(b, "eof", |b| {
            b.local(0);
            1
        });
        b.jump(OpCode::Jnz, done);
        print(b, |b| {
            b.global("read").local(0).call(1);
            1
        });
        b.jump(OpCode::Jmp, top);
        b.bind(done);
        close(b, 0);
    });
    std::fs::remove_file(&path).unwrap();
    assert_eq!(out, "alpha\nbeta\ngamma\n");
}

#[test]
fn test_read_loop_until_null() {
    let path = temp_path("null-loop.txt");
    std::fs::write(&path, "1\r\n2\n3").unwrap();
    // s = 0; while (line = read(h)) != null { s += line }
    let (v, _) = run_captured(|b| {
        open_into(b, 0, &path, "");
        set_local(b, 1, |b| {
            b.load_int(0);
        });
        let top = b.label();
        let done = b.label();
        b.bind(top);
        set_local(b, 2, |b| {
            b.global("read").local(0).call(1);
        });
        b.local(2).load_null().emit(OpCode::Eq).jump(OpCode::Jnz, done);
        b.local_addr(1).local(2).emit(OpCode::AddAssign).emit(OpCode::Pop);
        b.jump(OpCode::Jmp, top);
        b.bind(done);
        close(b, 0);
        b.local(1).emit(OpCode::Ret);
    });
    std::fs::remove_file(&path).unwrap();
    assert_int(&v, 6);
}

#[test]
fn test_append_mode() {
    let path = temp_path("append.txt");
    std::fs::write(&path, "first\n").unwrap();
    run_output(|b| {
        open_into(b, 0, &path, "a");
        call_global(b, "write", |b| {
            b.local(0).load_str("second").load_int(2).load_str("\n");
            4
        });
        b.emit(OpCode::Pop);
        close(b, 0);
    });
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(text, "first\nsecond2\n");
}

#[test]
fn test_write_to_read_handle_fails_softly() {
    let path = temp_path("readonly.txt");
    std::fs::write(&path, "x").unwrap();
    let (v, _) = run_captured(|b| {
        open_into(b, 0, &path, "r");
        call_global(b, "write", |b| {
            b.local(0).load_str("nope");
            2
        });
        close(b, 0);
        b.emit(OpCode::Ret);
    });
    std::fs::remove_file(&path).unwrap();
    assert_int(&v, 0);
}

#[test]
fn test_open_missing_file_stops_script() {
    let path = temp_path("missing/none.txt");
    let err = run_err(|b| {
        open_into(b, 0, &path, "r");
        print(b, |b| {
            b.load_str("unreachable");
            1
        });
    });
    match err {
        VmError::Resource { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_print_output_before_error_is_kept() {
    let (mut vm, out) = new_vm();
    let mut b = CodeBuilder::new();
    print(&mut b, |b| {
        b.load_str("partial");
        1
    });
    b.load_int(1).call(0);
    let err = vm.eval(b.finish().unwrap()).unwrap_err();
    assert!(matches!(err, VmError::NotCallable("int")), "{err}");
    assert_eq!(out.text(), "partial\n");
}
