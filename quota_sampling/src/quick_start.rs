/*!

# Quick start

This example draws a sample of 300 respondents from a consolidated pool exported as a CSV file.

**Preparing the pool** The pool must have one row per respondent and at least a `survey_id` column.
Standardized columns (`regiao`, `renda_macro_faixa`, `localidade`, `idade_numerica`, `data_pesquisa`)
are used as they are. When they are missing, the raw answers are standardized on the fly: the state
gives the region, the city gives the locality and the income answer gives the bracket.

```text
respondent_id,survey_id,regiao,renda_macro_faixa,localidade,idade_numerica,data_pesquisa,genero
1001,12,Sudeste,"2. R$ 2,5 a R$ 5 mil",Capital,34,2024-03-02,Feminino
1002,12,Sul,"3. R$ 5 a R$ 10 mil",Interior,51,2024-03-02,Masculino
...
```

**Checking what is available** Run `qsample` with the default weights:

```bash
qsample --input pool.csv --size 300
```

The summary is printed on the standard output. Look at `feasibility` first: a category whose
`availableN` is below its `desiredN` cannot be filled from the pool. Then `proportionalSample.minRatio`
tells how much of the requested size a sample with exact proportions can reach. The `collectionGaps`
section lists the strata to collect more respondents from.

**Fixing the request** Write a configuration file, `request.json`, next to the pool:

```json
{
  "outputSettings": {"sampleName": "march", "outputDirectory": "output"},
  "poolSources": [{"provider": "csv", "filePath": "pool.csv"}],
  "filters": {"ageRange": {"min": 18, "max": 65}},
  "cohorts": {"excludeSurveys": [4]},
  "weights": {"locality": {"Capital": 50, "Interior": 50}},
  "requestedSize": 300,
  "randomSeed": 2024
}
```

and run:

```bash
qsample --config request.json
```

The summary is written to `output/march_summary.json`.

**Exporting** To get the answers of the sampled respondents, pass the consolidated answers
(long format) and a directory:

```bash
qsample --config request.json --answers answers.csv --export-dir output
```

This writes `output/forced_sample_300.csv` and, when the proportional sample is not empty,
`output/proportional_sample_<N>.csv`.

**Keeping track** Because the seed is fixed, the same command gives the same samples. Keep the
summary: `qsample --config request.json --reference output/march_summary.json` fails and prints the
differences if the pool or the request changed since.

*/
