use crate::perfmon::TextWrapper;

#[test]
fn short_text_is_single_line() {
    let w = TextWrapper::new(70);
    assert_eq!(w.wrap("Core cycles"), vec!["Core cycles".to_string()]);
}

#[test]
fn empty_text_has_no_lines() {
    assert!(TextWrapper::new(70).wrap("").is_empty());
}

#[test]
fn keeps_whitespace_at_line_boundaries() {
    let w = TextWrapper::new(10);
    let lines = w.wrap("aaaa bbbb cccc dddd");
    assert_eq!(lines, vec!["aaaa bbbb ", "cccc dddd"]);
}

#[test]
fn concatenation_reproduces_input() {
    let text = "Number of times a request needed a FB (Fill Buffer) entry but there \
                was no entry available for it. A request includes cacheable/uncacheable \
                demands that are load, store or SW prefetch instructions.";
    for width in [8, 20, 33, 70] {
        let lines = TextWrapper::new(width).wrap(text);
        assert!(lines.iter().all(|l| l.chars().count() <= width), "width {width}");
        assert_eq!(lines.concat(), text, "width {width}");
    }
}

#[test]
fn breaks_words_longer_than_width() {
    let lines = TextWrapper::new(4).wrap("abcdefghij");
    assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
}

#[test]
fn prefers_breaking_after_hyphen() {
    let lines = TextWrapper::new(12).wrap("see front-end stalls");
    assert_eq!(lines, vec!["see front-", "end stalls"]);
}

#[test]
fn tabs_and_newlines_become_spaces() {
    let lines = TextWrapper::new(70).wrap("a\tb\nc");
    assert_eq!(lines, vec!["a       b c"]);
}

#[test]
fn hyphen_after_single_letter_run_breaks() {
    let w = |width, text| TextWrapper::new(width).wrap(text);
    assert_eq!(w(3, "a-b-cdef"), vec!["a-", "b-c", "def"]);
    assert_eq!(w(5, "zz-a-bc"), vec!["zz-a-", "bc"]);
    assert_eq!(w(4, "e-f-gh"), vec!["e-f-", "gh"]);
}

#[test]
fn underscore_counts_as_letter_and_digit_does_not() {
    let w = |width, text| TextWrapper::new(width).wrap(text);
    assert_eq!(w(3, "x_-ab cd"), vec!["x_-", "ab ", "cd"]);
    assert_eq!(w(3, "ab_-cd"), vec!["ab_", "-cd"]);
    assert_eq!(w(3, "x1-ab"), vec!["x1-", "ab"]);
}

#[test]
fn mixed_dashes_tabs_and_digits() {
    let lines = TextWrapper::new(11).wrap("c\te-f-gh1b1-bx.--_1e-f-gh\u{e9}");
    assert_eq!(
        lines,
        vec!["c       ", "e-f-", "gh1b1-bx.--", "_1e-f-gh\u{e9}"]
    );
    assert_eq!(TextWrapper::new(5).wrap("well--known"), vec!["well", "--", "known"]);
}
