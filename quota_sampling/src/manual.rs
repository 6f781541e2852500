/*!

This is the long-form manual for `quota_sampling` and `qsample`.

## Overview

A pool accumulates the respondents of many surveys. Each respondent is stratified along three
dimensions:
* `region`: Sudeste, Nordeste, Sul, Centro-Oeste, Norte
* `income`: the five household income brackets, from `1. Menor que R$ 2,5 mil` to `5. Acima de R$ 20 mil`
* `locality`: Capital or Interior

A request asks for a number of respondents distributed along these dimensions by percentage weights.
Two samples are produced for every request:
* the **forced sample** always reaches the requested size when the pool allows it. It keeps the core
  cohort first, fills the income brackets in the order of the weights, splits each bracket by region
  and locality, then backfills from whatever is left.
* the **proportional sample** keeps the exact proportions of the weights. Every stratum is scaled by
  the same factor, the smallest ratio of availability over target. It is smaller than requested as
  soon as one stratum is short.

The summary also reports, per category, how far the forced sample is from the desired counts, and
per stratum how many respondents are missing to make the proportional sample complete.

## Pool files

The pool is read from CSV (`csv`) or Excel (`xlsx`) files. The first row holds the column names.
Only `survey_id` is mandatory. The other known columns are:

| field          | accepted columns                              | notes                                   |
|----------------|-----------------------------------------------|-----------------------------------------|
| identifier     | `respondent_id`                               | defaults to `<file name>-<line number>` |
| region         | `regiao`, else `estado_original`/`Estado`     | a state abbreviation is mapped to its region |
| income         | `renda_macro_faixa`, `renda_faixa_padronizada`, else `renda_texto_original`/`FE2P10` | free text answers are estimated and banded |
| locality       | `localidade`, else `cidade_original`/`FE2P7`  | state capitals are `Capital`, other cities `Interior` |
| age            | `idade_numerica`, `FE2P5`                     |                                         |
| collection day | `data_pesquisa`, `Data`                       | `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `DD/MM/YYYY` |

Every other column is carried along as a descriptive attribute (gender, purchase intent, ...). It
shows up in the sample profile and in the exported samples. The age band (`faixa_etaria`) and the
generation (`geracao`) are derived from the age when the file does not have them.

A respondent whose region, income or locality cannot be resolved stays in the pool but never matches
a stratum. It can still be picked by the global backfill.

## Configuration

```json
{
  "outputSettings": {"sampleName": "wave_12", "outputDirectory": "output"},
  "poolSources": [{"provider": "csv", "filePath": "pool.csv"}],
  "filters": {
    "dateRange": {"start": "2024-01-01", "end": "2024-12-31"},
    "ageRange": {"min": 21, "max": 71}
  },
  "cohorts": {"includeSurveys": [7], "excludeSurveys": [3]},
  "weights": {
    "region": {"Sudeste": 30, "Nordeste": 30, "Sul": 25, "Centro-Oeste": 10, "Norte": 5},
    "income": {
      "2. R$ 2,5 a R$ 5 mil": 30,
      "3. R$ 5 a R$ 10 mil": 30,
      "4. R$ 10 a R$ 20 mil": 20,
      "5. Acima de R$ 20 mil": 20
    },
    "locality": {"Capital": 60, "Interior": 40}
  },
  "requestedSize": 1200,
  "randomSeed": 42
}
```

All the sections are optional. The defaults are the weights above (with `0` for the lowest income
bracket), the age range 21 to 71, no date range and a requested size of 1200.

Notes:
- each weight set must add up to 100 (with a tolerance of 0.1) and every weight lies between 0 and 100.
- the order of the income weights matters: brackets are filled in this order.
- the surveys of `includeSurveys` form the core cohort. They are always kept, even outside the date
  and age filters. A survey both included and excluded is included.
- the surveys named in the cohorts must be present in the pool.
- collection days after `filters.referenceDate` (or `--reference-date`, default: the day recorded in the
  `--reference` summary, else today) are treated as unknown. The day used is written in the summary.
- with an active date range, respondents without a collection day are dropped. Respondents without
  an age are always dropped by the age range.
- `poolSources` paths are relative to the directory of the configuration file.

## Randomness

Every call picks its respondents with a random generator built from a seed. The seed comes from
`randomSeed` or `--seed`. Without any, a fresh seed is drawn and written in the summary: running again
with this seed gives the same samples. The summary also holds a fingerprint of the request, which
changes whenever a filter, a cohort, a weight, the size or the seed changes.

## Outputs

The summary is a JSON document:
- `config`: sample name, requested size, seed, fingerprint and reference date
- `status`: `completed`, or `noData` when no respondent survives the filters and there is no core cohort
- `pool`: total size, size of the core cohort and of the filtered pool
- `feasibility`: per category, the desired count (`floor(size × weight / 100)`) and the available count
- `strata`: per stratum, the target weight, the fractional target, the available count and their ratio
- `forcedSample` and `proportionalSample`: members and how they were drawn
- `deviation`: realized count of the forced sample per category, with `under`, `over` or `exact`
- `collectionGaps`: per stratum, the respondents to collect for a complete proportional sample,
  with totals per category and (income × region) matrices
- `bottlenecks`: strata with a positive target and nobody available
- `sourceAudit`: forced sample counts by survey, region and locality
- `profile`: shares of every category and attribute value in the forced sample

With `--answers` and `--export-dir`, both samples are also written as wide CSV tables
(`forced_sample_<N>.csv`, `proportional_sample_<N>.csv`): one row per respondent, one column per
question code, then the descriptive columns. The answers file is in long format with the columns
`respondent_id`, `survey_id`, `question_code` and `answer_value`. Question texts are mapped to their
codes when known (see [`crate::standardize::ColumnCatalog`]).

*/
