/*!

This is the long-form manual for `book_tally` and `bookvote`.

## Counting rules

Every round, each ballot counts for its highest ranked book that is still
running. Ballots that rank no running book are *exhausted*: they are left
out of the tally and out of the number of valid ballots for that round.

1. A book holding strictly more than half of the valid ballots wins.
2. A book left alone in the race wins.
3. Otherwise the books with the lowest tally are eliminated. If every
   running book shares that lowest tally, the count stops and reports a
   tie between all of them.

The count never takes more rounds than there are books.

### Elimination

* `allTiedLowest` (default): all the books at the lowest tally are removed
  in the same round.
* `single`: one book is removed per round. When several books share the
  lowest tally, the `tiebreakMode` decides:
  * `useCandidateOrder`: the book nominated last goes first,
  * `nextPreference`: the book that the fewest ballots rank right after
    their current choice goes first, then the book nominated last,
  * `random`: a reproducible draw that depends on `randomSeed`.

## Election file

`bookvote` reads a JSON description of the election with the `--config`
flag:

```text
{
  "outputSettings": { "contestName": "October pick", "contestDate": "2026-10-01" },
  "books": [
    { "title": "Dune", "author": "Frank Herbert", "pageCount": 412 },
    { "title": "Emma", "author": "Jane Austen" }
  ],
  "votes": { "ana": ["Dune by Frank Herbert", "Emma by Jane Austen"] },
  "ballotSources": [ { "provider": "csv", "filePath": "ballots.csv" } ],
  "rules": { "eliminationMode": "single", "tiebreakMode": "nextPreference" }
}
```

The identifier of a book is built from its title and its author unless an
`id` is given. A choice on a ballot may be the identifier or the label
(`<title> by <author>`) of a book.

## Ballot files

### `csv`

One row per voter. The voter name is in the first column and the choices
follow, most preferred first. Empty cells are skipped ranks.

```text
voter,choice 1,choice 2,choice 3
ana,Dune by Frank Herbert,Emma by Jane Austen,
bo,emma_jane_austen,,
```

The options `voterColumnIndex`, `firstVoteColumnIndex` and
`firstVoteRowIndex` of a ballot source move these columns around. They
take 1-based numbers or Excel column letters. `voterColumnIndex: 0`
reads anonymous ballots: every voter is then named after the file and
the line, as is any row with a blank voter cell.

### `xlsx`

The same layout in an Excel workbook, for example the responses of a
Google Forms or Microsoft Forms poll. Use `excelWorksheetName` (or the
`--excel-worksheet-name` flag) when the workbook has several sheets.
Rows and columns are counted from the top left corner of the sheet, even
when the first rows or columns are empty.

## Outputs

* `--out` writes a JSON summary of every round, compatible with the
  RCVis visualisation website.
* `--reference` compares that summary with a previous one and fails on
  any difference.
* `--history` appends one row per book to a CSV log that can be opened in
  any spreadsheet.

 */
