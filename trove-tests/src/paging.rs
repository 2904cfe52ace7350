use crate::model::{Document, delete_all, doc_type};
use trove::{Connection, Entity, Error, Record};

pub fn paging<C: Connection>(connection: &mut C) {
    delete_all(connection);
    let report = doc_type(connection, "Report");
    let other = doc_type(connection, "Other");
    for i in 1..=25 {
        let mut document = Record::<Document>::new(connection).unwrap();
        *document = Document::titled(Some(report), &format!("Page {}", i));
        document.views = Some(i);
        document.save(connection).expect("Failed to save a report");
    }
    let mut document = Record::<Document>::new(connection).unwrap();
    *document = Document::titled(Some(other), "Elsewhere");
    document.save(connection).unwrap();

    let mut reports = Document::find_where(connection, "typeId = ?", &[report.into()]).unwrap();
    assert_eq!(reports.size().unwrap(), 25);
    drop(reports);

    // Ordered by key when no order is given
    let mut page = Document::find_where(connection, "typeId = ?", &[report.into()])
        .unwrap()
        .paged(2, 10)
        .expect("Failed to page the reports");
    assert_eq!(page.size().unwrap(), 10);
    assert_eq!(page.total().unwrap(), 25);
    let list = page.list().unwrap();
    assert_eq!(list.len(), 10);
    assert_eq!(list.total(), 25);
    assert_eq!(list[0].title.as_deref(), Some("Page 11"));
    assert_eq!(list[9].title.as_deref(), Some("Page 20"));

    let mut page = Document::find_where(connection, "typeId = ?", &[report.into()])
        .unwrap()
        .paged(3, 10)
        .unwrap();
    assert_eq!(page.size().unwrap(), 5);
    let views = page
        .iter()
        .unwrap()
        .map(|v| v.map(|v| v.views.unwrap_or_default()))
        .collect::<trove::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(views, [21, 22, 23, 24, 25]);

    let mut page = Document::find_where(connection, "typeId = ?", &[report.into()])
        .unwrap()
        .paged(4, 10)
        .unwrap();
    assert_eq!(page.size().unwrap(), 0);
    assert!(page.is_empty().unwrap());
    assert_eq!(page.total().unwrap(), 25);
    assert!(page.list().unwrap().is_empty());

    // Pages joined back together give the whole result once
    let mut expected = Document::find_where(connection, "typeId = ?", &[report.into()])
        .unwrap()
        .list()
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect::<Vec<_>>();
    expected.sort();
    let mut joined = Vec::new();
    for number in 1..=3 {
        let mut page = Document::find_where(connection, "typeId = ?", &[report.into()])
            .unwrap()
            .paged(number, 10)
            .unwrap();
        joined.extend(page.list().unwrap().iter().map(|v| v.id));
    }
    assert_eq!(joined.len(), 25);
    assert_eq!(joined, expected);

    let mut page = Document::sql(
        connection,
        "SELECT * FROM Documents WHERE typeId = ? ORDER BY views DESC",
        &[report.into()],
    )
    .unwrap()
    .paged(1, 4)
    .unwrap();
    let titles = page
        .list()
        .unwrap()
        .iter()
        .map(|v| v.title.clone().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(titles, ["Page 25", "Page 24", "Page 23", "Page 22"]);
    assert_eq!(page.total().unwrap(), 25);

    let mut all = Document::find_all(connection).unwrap().paged(1, 100).unwrap();
    assert_eq!(all.size().unwrap(), 26);

    // Misuse
    assert!(matches!(
        Document::find_all(connection).unwrap().paged(0, 10),
        Err(Error::Usage(..))
    ));
    let mut results = Document::find_all(connection).unwrap();
    let _ = results.iter().unwrap().next();
    assert!(matches!(results.paged(1, 10), Err(Error::Usage(..))));
    assert!(matches!(
        Document::sql(
            connection,
            "SELECT typeId FROM Documents GROUP BY typeId",
            &[],
        )
        .unwrap()
        .paged(1, 10),
        Err(Error::Usage(..))
    ));
    // Statements that cannot be paged run whole
    let mut whole = Document::sql(
        connection,
        "SELECT * FROM Documents WHERE id IN (SELECT id FROM Documents WHERE typeId = ?)",
        &[other.into()],
    )
    .unwrap()
    .paged(5, 10)
    .unwrap();
    assert_eq!(whole.list().unwrap().len(), 1);
}
