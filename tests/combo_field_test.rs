use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use stepform::{
    Error, FieldDescriptor, FieldValue, FormConfig, FormOptions, FormSpec, Key, PageDescriptor,
    Result, Session,
};

const COMBO_PROPTEST_REGRESSION_FILE: &str = "tests/proptest-regressions/combo_field_test.txt";
const DEFAULT_COMBO_PROPTEST_CASES: u32 = 128;

fn env_proptest_cases(var_name: &str, default: u32) -> u32 {
    std::env::var(var_name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn combo_spec(options: &[String]) -> FormSpec {
    FormSpec::new(vec![PageDescriptor::new("Pick").with_field(
        FieldDescriptor::new("combobox")
            .with_name("fruit")
            .with_description("Fruit")
            .with_placeholder("Search")
            .with_search("Go")
            .with_options(options.iter().cloned()),
    )])
}

fn fruit_session() -> Result<Session> {
    let options = ["Apple", "Banana", "Avocado"].map(String::from);
    Session::mount("<main id='app'></main>", "#app", &combo_spec(&options), FormOptions::default())
}

fn hidden_rows(session: &Session) -> Result<usize> {
    Ok(session
        .document()
        .query_selector_all(".combo-menu > div.hide")?
        .len())
}

fn skipped_options(session: &Session) -> Result<usize> {
    Ok(session
        .document()
        .query_selector_all(".combo-menu input[tabindex='-1']")?
        .len())
}

#[test]
fn combo_renders_search_box_and_hidden_menu() -> Result<()> {
    let session = fruit_session()?;
    session.assert_text("div.combo > p", "Fruit:")?;
    session.assert_exists("div.combo > div.combo-search > input#search[placeholder='Search']")?;
    session.assert_text("#search_button", "Go")?;
    session.assert_class(".combo-menu", "hide", true)?;
    assert_eq!(session.document().query_selector_all(".combo-menu input[type=radio]")?.len(), 3);
    session.assert_text("label[for='fruit_2']", "Avocado")?;
    Ok(())
}

#[test]
fn search_filters_options_case_insensitively() -> Result<()> {
    let mut session = fruit_session()?;
    session.focus("#search")?;
    session.assert_class(".combo-menu", "hide", false)?;

    session.type_text("#search", "a")?;
    assert_eq!(hidden_rows(&session)?, 0);
    assert_eq!(skipped_options(&session)?, 0);

    session.type_text("#search", "Av")?;
    assert_eq!(hidden_rows(&session)?, 2);
    assert_eq!(skipped_options(&session)?, 2);
    let avocado = session
        .document()
        .query_selector("#fruit_2")?
        .ok_or_else(|| Error::SelectorNotFound("#fruit_2".into()))?;
    assert_eq!(session.document().attr(avocado, "tabindex"), None);

    session.type_text("#search", "")?;
    assert_eq!(hidden_rows(&session)?, 0);
    assert_eq!(skipped_options(&session)?, 0);
    Ok(())
}

#[test]
fn checking_an_option_copies_its_label_into_the_search_box() -> Result<()> {
    let mut session = fruit_session()?;
    session.click("label[for='fruit_1']")?;
    session.assert_checked("#fruit_1", true)?;
    session.assert_value("#search", "Banana")?;

    session.click("#fruit_0")?;
    session.assert_checked("#fruit_1", false)?;
    session.assert_value("#search", "Apple")?;
    assert_eq!(
        session.values()?,
        vec![(0, 0, FieldValue::Text("Apple".into()))]
    );
    Ok(())
}

#[test]
fn enter_on_an_option_checks_and_commits_it() -> Result<()> {
    let mut session = fruit_session()?;
    session.press_key("#fruit_2", Key::enter())?;
    session.assert_checked("#fruit_2", true)?;
    session.assert_value("#search", "Avocado")?;
    assert_eq!(session.current_page_index(), 0);
    assert!(session.submissions().is_empty());
    Ok(())
}

#[test]
fn refocus_within_the_delay_keeps_the_menu_open() -> Result<()> {
    let mut session = fruit_session()?;
    session.focus("#search")?;
    session.type_text("#search", "Av")?;
    session.blur("#search")?;
    assert_eq!(session.pending_timers().len(), 1);
    assert_eq!(session.pending_timers()[0].due_at, 100);

    session.advance_time(50)?;
    session.focus("#fruit_2")?;
    session.advance_time(60)?;
    assert!(session.pending_timers().is_empty());
    session.assert_class(".combo-menu", "hide", false)?;
    assert_eq!(hidden_rows(&session)?, 2);
    Ok(())
}

#[test]
fn losing_focus_for_the_full_delay_closes_and_resets_the_menu() -> Result<()> {
    let mut session = fruit_session()?;
    session.focus("#search")?;
    session.type_text("#search", "Av")?;
    session.blur("#search")?;

    session.advance_time(99)?;
    session.assert_class(".combo-menu", "hide", false)?;
    session.advance_time(1)?;
    session.assert_class(".combo-menu", "hide", true)?;
    assert_eq!(hidden_rows(&session)?, 0);
    assert!(
        session
            .document()
            .query_selector_all(".combo-menu input[tabindex]")?
            .is_empty()
    );
    session.assert_value("#search", "Av")?;
    Ok(())
}

#[test]
fn stale_checks_are_not_cancelled_and_read_focus_when_they_fire() -> Result<()> {
    let mut session = fruit_session()?;
    session.focus("#search")?;
    session.blur("#search")?;
    session.advance_time(20)?;
    session.focus("#fruit_0")?;
    session.advance_time(20)?;
    session.blur("#fruit_0")?;
    assert_eq!(session.pending_timers().len(), 2);

    // Focus is gone at t=100, so the first check closes the menu.
    session.advance_time_to(100)?;
    session.assert_class(".combo-menu", "hide", true)?;

    session.focus("#search")?;
    session.flush()?;
    assert_eq!(session.now_ms(), 140);
    session.assert_class(".combo-menu", "hide", false)?;
    Ok(())
}

#[test]
fn a_cleared_check_never_closes_the_menu() -> Result<()> {
    let mut session = fruit_session()?;
    session.focus("#search")?;
    session.blur("#search")?;
    let id = session.pending_timers()[0].id;
    assert!(session.clear_timer(id));
    assert!(!session.clear_timer(id));
    session.advance_time(500)?;
    session.assert_class(".combo-menu", "hide", false)?;
    Ok(())
}

#[test]
fn close_delay_comes_from_config() -> Result<()> {
    let options = ["Apple", "Banana"].map(String::from);
    let config = FormConfig::from_json(r#"{ "menu_close_delay_ms": 250 }"#)?;
    let mut session = Session::mount(
        "<main id='app'></main>",
        "#app",
        &combo_spec(&options),
        FormOptions::default().with_config(config),
    )?;
    session.focus("#search")?;
    session.blur("#search")?;
    assert_eq!(session.pending_timers()[0].due_at, 250);
    session.advance_time(200)?;
    session.assert_class(".combo-menu", "hide", false)?;
    session.advance_time(50)?;
    session.assert_class(".combo-menu", "hide", true)?;
    Ok(())
}

#[test]
fn unmount_drops_pending_menu_checks() -> Result<()> {
    let mut session = fruit_session()?;
    session.focus("#search")?;
    session.blur("#search")?;
    assert_eq!(session.pending_timers().len(), 1);
    let doc = session.unmount();
    assert!(doc.pending_timers().is_empty());
    Ok(())
}

fn label_strategy() -> BoxedStrategy<String> {
    "[abAB.+ ]{1,6}".boxed()
}

fn term_strategy() -> BoxedStrategy<String> {
    "[abAB.+]{0,3}".boxed()
}

fn assert_filter_matches_substring_rule(labels: &[String], term: &str) -> TestCaseResult {
    let fail = |err: Error| TestCaseError::fail(format!("{err:?}"));
    let mut session = Session::mount(
        "<main id='app'></main>",
        "#app",
        &combo_spec(labels),
        FormOptions::default(),
    )
    .map_err(fail)?;
    session.focus("#search").map_err(fail)?;
    session.type_text("#search", term).map_err(fail)?;

    let needle = term.to_lowercase();
    let mut expected_hidden = 0;
    for (index, label) in labels.iter().enumerate() {
        let selector = format!("#fruit_{index}");
        let input = session
            .document()
            .query_selector(&selector)
            .map_err(fail)?
            .ok_or_else(|| TestCaseError::fail(format!("missing {selector}")))?;
        let matches = label.to_lowercase().contains(&needle);
        if !matches {
            expected_hidden += 1;
        }
        let tabindex = session.document().attr(input, "tabindex");
        prop_assert_eq!(
            tabindex.as_deref() == Some("-1"),
            !matches,
            "label {:?} term {:?}",
            label,
            term
        );
    }
    prop_assert_eq!(hidden_rows(&session).map_err(fail)?, expected_hidden);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: env_proptest_cases("STEPFORM_PROPTEST_CASES", DEFAULT_COMBO_PROPTEST_CASES),
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct(
            COMBO_PROPTEST_REGRESSION_FILE,
        ))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn combo_filter_hides_exactly_the_non_matching_options(
        labels in vec(label_strategy(), 1..=5),
        term in term_strategy(),
    ) {
        assert_filter_matches_substring_rule(&labels, &term)?;
    }
}
